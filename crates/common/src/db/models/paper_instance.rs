//! Paper instance entity
//!
//! A bibliographic record as it appeared in one source. Rows with
//! `concrete = false` are citation stubs hanging off the record named by
//! `cited_by_id`; together they form the corpus' citation forest.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "paper_instances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    pub corpus_id: i32,

    pub created_by_id: i32,

    pub date_created: DateTimeUtc,

    /// Content hash used to avoid adding the same record twice
    #[sea_orm(column_type = "Text", nullable)]
    #[serde(default)]
    pub checksum: Option<String>,

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

impl Related<super::corpus::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Corpus.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
