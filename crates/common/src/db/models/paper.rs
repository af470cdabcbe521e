//! Canonical paper entity
//!
//! A disambiguated publication. Rows observed in a source are
//! `PaperInstance`s and are linked here through `PaperIdentity` assertions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    pub corpus_id: i32,

    pub created_by_id: i32,

    pub date_created: DateTimeUtc,

    /// Publication year
    #[serde(default)]
    pub publication_date: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub volume: Option<String>,

    #[serde(default)]
    pub issue: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    #[serde(default)]
    pub journal: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,

    #[serde(default = "super::default_concrete")]
    pub concrete: bool,

    #[serde(default)]
    pub cited_by_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::corpus::Entity",
        from = "Column::CorpusId",
        to = "super::corpus::Column::Id",
        on_delete = "Cascade"
    )]
    Corpus,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedById",
        to = "super::user::Column::Id"
    )]
    CreatedBy,

    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::CitedById",
        to = "Column::Id",
        on_delete = "Cascade"
    )]
    CitedBy,
}

impl ActiveModelBehavior for ActiveModel {}
