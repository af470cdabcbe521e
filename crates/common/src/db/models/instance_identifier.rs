//! Named external identifier (DOI, ISSN, ...) of a paper instance

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "instance_identifiers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    pub corpus_id: i32,

    pub created_by_id: i32,

    pub date_created: DateTimeUtc,

    pub paper_id: i32,

    /// E.g. doi, issn, uri
    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub value: String,
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
}

impl ActiveModelBehavior for ActiveModel {}
