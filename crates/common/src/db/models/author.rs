//! Canonical author entity
//!
//! A specific person. Authors are only related to papers by way of
//! `AuthorInstance`s and `AuthorIdentity` assertions; this table is never
//! populated directly from source data.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "authors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    #[sea_orm(column_type = "Text")]
    pub first_name: String,

    #[sea_orm(column_type = "Text")]
    pub last_name: String,

    #[serde(default)]
    pub initials: Option<String>,

    /// E.g. a VIAF or DBPedia URI
    #[sea_orm(column_type = "Text", nullable)]
    #[serde(default)]
    pub identifier: Option<String>,

    #[sea_orm(column_type = "Text")]
    #[serde(default)]
    pub description: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
