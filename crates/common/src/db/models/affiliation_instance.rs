//! A (probable) affiliation between an author instance and an institution
//! instance on the same paper

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "affiliation_instances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    pub corpus_id: i32,

    pub created_by_id: i32,

    pub date_created: DateTimeUtc,

    pub paper_id: i32,

    pub author_id: i32,

    pub institution_id: i32,

    /// 1.0 for a precise author-institution mapping, otherwise 1/N over the
    /// N institutions the author could belong to
    #[serde(default)]
    pub confidence: f64,
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
        belongs_to = "super::paper_instance::Entity",
        from = "Column::PaperId",
        to = "super::paper_instance::Column::Id",
        on_delete = "Cascade"
    )]
    Paper,

    #[sea_orm(
        belongs_to = "super::author_instance::Entity",
        from = "Column::AuthorId",
        to = "super::author_instance::Column::Id",
        on_delete = "Cascade"
    )]
    Author,

    #[sea_orm(
        belongs_to = "super::institution_instance::Entity",
        from = "Column::InstitutionId",
        to = "super::institution_instance::Column::Id",
        on_delete = "Cascade"
    )]
    Institution,
}

impl ActiveModelBehavior for ActiveModel {}
