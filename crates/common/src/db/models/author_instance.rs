//! An author name as it appears on one paper instance

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "author_instances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    pub corpus_id: i32,

    pub created_by_id: i32,

    pub date_created: DateTimeUtc,

    pub paper_id: i32,

    /// Sources sometimes carry only a surname
    #[serde(default)]
    pub first_name: Option<String>,

    pub last_name: String,
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
