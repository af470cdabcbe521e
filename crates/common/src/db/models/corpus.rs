//! Corpus entity: one imported collection of bibliographic records

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where the records of a corpus came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CorpusSource {
    Jstor,
    Wos,
    Zotero,
    Scopus,
}

impl CorpusSource {
    pub const ALL: [CorpusSource; 4] = [
        CorpusSource::Jstor,
        CorpusSource::Wos,
        CorpusSource::Zotero,
        CorpusSource::Scopus,
    ];

    /// Stored value
    pub fn as_str(&self) -> &'static str {
        match self {
            CorpusSource::Jstor => "JSTOR",
            CorpusSource::Wos => "WOS",
            CorpusSource::Zotero => "ZOTERO",
            CorpusSource::Scopus => "SCOPUS",
        }
    }

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            CorpusSource::Jstor => "JSTOR DfR",
            CorpusSource::Wos => "Web of Science",
            CorpusSource::Zotero => "Zotero",
            CorpusSource::Scopus => "Scopus",
        }
    }
}

impl fmt::Display for CorpusSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorpusSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CorpusSource::ALL
            .into_iter()
            .find(|source| source.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown corpus source {:?}", s))
    }
}

impl From<CorpusSource> for String {
    fn from(source: CorpusSource) -> Self {
        source.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "corpora")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,

    /// One of `CorpusSource`, stored as text
    #[sea_orm(column_type = "Text")]
    pub source: String,

    #[sea_orm(column_type = "Text")]
    pub label: String,

    pub date_created: DateTimeUtc,

    pub created_by_id: i32,
}

impl Model {
    /// Get the source as an enum
    pub fn corpus_source(&self) -> Option<CorpusSource> {
        self.source.parse().ok()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedById",
        to = "super::user::Column::Id"
    )]
    CreatedBy,

    #[sea_orm(has_many = "super::paper_instance::Entity")]
    PaperInstances,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreatedBy.def()
    }
}

impl Related<super::paper_instance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaperInstances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
