//! Assertion that a `PaperInstance` refers to a particular canonical `Paper`

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "paper_identities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    /// Disambiguation run that produced the assertion
    pub model_id: i32,

    /// 0.0 means unset
    #[serde(default)]
    pub confidence: f64,

    #[sea_orm(column_type = "Text")]
    #[serde(default)]
    pub methods: String,

    pub paper_id: i32,

    pub instance_id: i32,
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
        belongs_to = "super::paper::Entity",
        from = "Column::PaperId",
        to = "super::paper::Column::Id",
        on_delete = "Cascade"
    )]
    Paper,

    #[sea_orm(
        belongs_to = "super::paper_instance::Entity",
        from = "Column::InstanceId",
        to = "super::paper_instance::Column::Id",
        on_delete = "Cascade"
    )]
    Instance,
}

impl ActiveModelBehavior for ActiveModel {}
