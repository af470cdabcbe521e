//! Assertion that a canonical author is affiliated with a canonical
//! institution, optionally over a date range

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "affiliations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    pub model_id: i32,

    #[serde(default)]
    pub confidence: f64,

    #[sea_orm(column_type = "Text")]
    #[serde(default)]
    pub methods: String,

    pub author_id: i32,

    pub institution_id: i32,

    #[serde(default)]
    pub start_date: Option<Date>,

    #[serde(default)]
    pub end_date: Option<Date>,

    #[serde(default)]
    pub occur_date: Option<Date>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::disambiguation_model::Entity",
        from = "Column::ModelId",
        to = "super::disambiguation_model::Column::Id",
        on_delete = "Cascade"
    )]
    DisambiguationModel,

    #[sea_orm(
        belongs_to = "super::author::Entity",
        from = "Column::AuthorId",
        to = "super::author::Column::Id",
        on_delete = "Cascade"
    )]
    Author,

    #[sea_orm(
        belongs_to = "super::institution::Entity",
        from = "Column::InstitutionId",
        to = "super::institution::Column::Id",
        on_delete = "Cascade"
    )]
    Institution,
}

impl ActiveModelBehavior for ActiveModel {}
