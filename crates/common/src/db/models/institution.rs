//! Canonical institution entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "institutions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub city: Option<String>,

    /// Room for zip+4 including the hyphen
    #[serde(default)]
    pub zip: Option<String>,

    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
