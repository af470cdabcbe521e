//! Table descriptions shared by the REST surface and the importer
//!
//! Each [`Resource`] names one table: its URL segment, the query parameters
//! it can be filtered by, and whether its rows are owned by a user. The
//! repository and the gateway handlers are written once against this trait.

use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::identity::Confidence;
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, EntityTrait, FromQueryResult,
    IntoActiveModel, ModelTrait,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::str::FromStr;

/// Prefix every resource URL is mounted under
pub const API_PREFIX: &str = "/v2";

/// How a query parameter is matched against its column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Text equality
    Exact,
    /// Integer equality (ids, years)
    Integer,
    /// Case-insensitive substring
    Contains,
    /// Boolean equality
    Flag,
    /// Numeric lower bound, inclusive
    AtLeast,
}

/// One declared filter: `?param=value` applied to `column`
#[derive(Debug, Clone, Copy)]
pub struct FieldFilter {
    pub param: &'static str,
    pub column: &'static str,
    pub kind: FilterKind,
}

const fn filter(param: &'static str, column: &'static str, kind: FilterKind) -> FieldFilter {
    FieldFilter { param, column, kind }
}

/// Instance tables that other rows of a corpus point into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceTable {
    Paper,
    Author,
    Institution,
}

impl InstanceTable {
    pub fn name(&self) -> &'static str {
        match self {
            InstanceTable::Paper => "PaperInstance",
            InstanceTable::Author => "AuthorInstance",
            InstanceTable::Institution => "InstitutionInstance",
        }
    }
}

/// Foreign key whose target must belong to the caller and share the row's corpus
#[derive(Debug, Clone, Copy)]
pub struct CorpusLink {
    pub column: &'static str,
    pub target: InstanceTable,
}

const fn corpus_link(column: &'static str, target: InstanceTable) -> CorpusLink {
    CorpusLink { column, target }
}

const PAPER_LINK: CorpusLink = corpus_link("paper_id", InstanceTable::Paper);

/// A row belongs to one corpus for its whole life
const CORPUS_SCOPED: &[&str] = &["corpus_id"];

impl FilterKind {
    /// Build the WHERE condition for one parameter value
    pub fn condition<C: ColumnTrait>(&self, column: C, param: &str, raw: &str) -> Result<SimpleExpr> {
        let invalid = || AppError::InvalidFilter {
            param: param.to_string(),
            value: raw.to_string(),
        };

        let expr = match self {
            FilterKind::Exact => column.eq(raw),
            FilterKind::Integer => column.eq(raw.trim().parse::<i32>().map_err(|_| invalid())?),
            FilterKind::Contains => Expr::expr(Func::lower(Expr::col(column)))
                .like(format!("%{}%", raw.to_lowercase())),
            FilterKind::Flag => column.eq(parse_flag(raw).ok_or_else(invalid)?),
            FilterKind::AtLeast => {
                column.gte(raw.trim().parse::<f64>().map_err(|_| invalid())?)
            }
        };

        Ok(expr)
    }
}

/// Accepts the spellings browsers and scripts commonly send
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// A table exposed through the generic repository and REST handlers
pub trait Resource: Send + Sync + 'static {
    type Entity: EntityTrait<
            Model = Self::Model,
            Column = Self::Column,
            ActiveModel = Self::ActiveModel,
        > + Send
        + Sync;
    type Model: ModelTrait<Entity = Self::Entity>
        + FromQueryResult
        + IntoActiveModel<Self::ActiveModel>
        + Serialize
        + DeserializeOwned
        + Clone
        + Send
        + Sync;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity> + ActiveModelBehavior + Send + Sync;
    type Column: ColumnTrait + FromStr + Send + Sync;

    /// URL segment under [`API_PREFIX`]
    const PATH: &'static str;

    /// Model name used in messages and import progress lines
    const NAME: &'static str;

    /// Query parameters accepted by the list endpoint
    const FILTERS: &'static [FieldFilter];

    /// Rows carry `created_by_id` and are only visible to their creator
    const OWNED: bool;

    /// Rows carry a `date_created` timestamp
    const TIMESTAMPED: bool;

    /// Append-only rows: no update, no delete
    const IMMUTABLE: bool = false;

    /// Columns fixed once the row exists
    const FROZEN: &'static [&'static str] = &[];

    /// Foreign keys into instance tables of the same corpus
    const CORPUS_LINKS: &'static [CorpusLink] = &[];

    /// Nullable column pointing back into the same table
    const SELF_REFERENCE: Option<&'static str> = None;

    /// Check and normalise an incoming row before it is deserialized
    fn validate(_row: &mut Map<String, Value>) -> Result<()> {
        Ok(())
    }

    /// Navigation links rendered next to a row
    fn links(_id: i32) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// Resolve a column by its snake_case name
pub fn column<R: Resource>(name: &str) -> Result<R::Column> {
    R::Column::from_str(name).map_err(|_| AppError::Internal {
        message: format!("{} has no column {}", R::NAME, name),
    })
}

/// Integer value of `name` in a serialized row
pub fn int_field(row: &Map<String, Value>, name: &str) -> Option<i32> {
    row.get(name)
        .and_then(Value::as_i64)
        .and_then(|value| i32::try_from(value).ok())
}

/// URL of one row
pub fn row_url<R: Resource>(id: i32) -> String {
    format!("{}/{}/{}", API_PREFIX, R::PATH, id)
}

fn list_url(path: &str, query: String) -> String {
    format!("{}/{}?{}", API_PREFIX, path, query)
}

fn validate_confidence(row: &mut Map<String, Value>) -> Result<()> {
    match row.get("confidence") {
        None | Some(Value::Null) => {
            row.insert("confidence".to_string(), Value::from(Confidence::UNSET.value()));
            Ok(())
        }
        Some(value) => {
            let raw = value
                .as_f64()
                .ok_or_else(|| AppError::invalid_field("confidence", "must be a number"))?;
            Confidence::new(raw)?;
            Ok(())
        }
    }
}

// ============================================================================
// Corpus-level tables
// ============================================================================

pub struct Corpora;

impl Resource for Corpora {
    type Entity = CorpusEntity;
    type Model = Corpus;
    type ActiveModel = CorpusActiveModel;
    type Column = CorpusColumn;

    const PATH: &'static str = "corpus";
    const NAME: &'static str = "Corpus";
    const FROZEN: &'static [&'static str] = &["source"];
    const FILTERS: &'static [FieldFilter] = &[
        filter("id", "id", FilterKind::Integer),
        filter("source", "source", FilterKind::Exact),
        filter("label", "label", FilterKind::Contains),
    ];
    const OWNED: bool = true;
    const TIMESTAMPED: bool = true;

    fn validate(row: &mut Map<String, Value>) -> Result<()> {
        let raw = row
            .get("source")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::MissingField { field: "source".into() })?;
        let source: CorpusSource = raw
            .parse()
            .map_err(|message: String| AppError::invalid_field("source", message))?;
        row.insert("source".to_string(), Value::from(source.as_str()));
        Ok(())
    }

    fn links(id: i32) -> Vec<(&'static str, String)> {
        vec![(
            "papers",
            list_url("paper_instance", format!("corpus={}&concrete=true", id)),
        )]
    }
}

pub struct DisambiguationModels;

impl Resource for DisambiguationModels {
    type Entity = DisambiguationModelEntity;
    type Model = DisambiguationModel;
    type ActiveModel = DisambiguationModelActiveModel;
    type Column = DisambiguationModelColumn;

    const PATH: &'static str = "disambiguation_model";
    const NAME: &'static str = "DisambiguationModel";
    const FILTERS: &'static [FieldFilter] = &[
        filter("id", "id", FilterKind::Integer),
        filter("label", "label", FilterKind::Contains),
    ];
    const OWNED: bool = true;
    const TIMESTAMPED: bool = true;
    // Deleting a run would cascade to every assertion it made
    const IMMUTABLE: bool = true;
}

// ============================================================================
// Papers
// ============================================================================

const PAPER_FILTERS: &[FieldFilter] = &[
    filter("id", "id", FilterKind::Integer),
    filter("corpus", "corpus_id", FilterKind::Integer),
    filter("title", "title", FilterKind::Contains),
    filter("abstract", "abstract_text", FilterKind::Contains),
    filter("journal", "journal", FilterKind::Contains),
    filter("publication_date", "publication_date", FilterKind::Integer),
    filter("volume", "volume", FilterKind::Exact),
    filter("issue", "issue", FilterKind::Exact),
    filter("concrete", "concrete", FilterKind::Flag),
    filter("cited_by", "cited_by_id", FilterKind::Integer),
];

pub struct Papers;

impl Resource for Papers {
    type Entity = PaperEntity;
    type Model = Paper;
    type ActiveModel = PaperActiveModel;
    type Column = PaperColumn;

    const PATH: &'static str = "paper";
    const FROZEN: &'static [&'static str] = CORPUS_SCOPED;
    const NAME: &'static str = "Paper";
    const FILTERS: &'static [FieldFilter] = PAPER_FILTERS;
    const OWNED: bool = true;
    const TIMESTAMPED: bool = true;
    const SELF_REFERENCE: Option<&'static str> = Some("cited_by_id");

    fn links(id: i32) -> Vec<(&'static str, String)> {
        vec![
            ("citations", list_url("paper", format!("cited_by={}&concrete=false", id))),
            ("instantiations", list_url("paper_identity", format!("paper={}", id))),
        ]
    }
}

pub struct PaperInstances;

impl Resource for PaperInstances {
    type Entity = PaperInstanceEntity;
    type Model = PaperInstance;
    type ActiveModel = PaperInstanceActiveModel;
    type Column = PaperInstanceColumn;

    const PATH: &'static str = "paper_instance";
    const FROZEN: &'static [&'static str] = CORPUS_SCOPED;
    const NAME: &'static str = "PaperInstance";
    const FILTERS: &'static [FieldFilter] = &[
        filter("id", "id", FilterKind::Integer),
        filter("corpus", "corpus_id", FilterKind::Integer),
        filter("checksum", "checksum", FilterKind::Exact),
        filter("title", "title", FilterKind::Contains),
        filter("abstract", "abstract_text", FilterKind::Contains),
        filter("journal", "journal", FilterKind::Contains),
        filter("publication_date", "publication_date", FilterKind::Integer),
        filter("volume", "volume", FilterKind::Exact),
        filter("issue", "issue", FilterKind::Exact),
        filter("concrete", "concrete", FilterKind::Flag),
        filter("cited_by", "cited_by_id", FilterKind::Integer),
    ];
    const OWNED: bool = true;
    const TIMESTAMPED: bool = true;
    const SELF_REFERENCE: Option<&'static str> = Some("cited_by_id");

    fn links(id: i32) -> Vec<(&'static str, String)> {
        vec![
            ("citations", list_url("paper_instance", format!("cited_by={}&concrete=false", id))),
            ("authors", list_url("author_instance", format!("paper={}", id))),
            ("institutions", list_url("institution_instance", format!("paper={}", id))),
            ("affiliations", list_url("affiliation_instance", format!("paper={}", id))),
            ("metadata", list_url("instance_metadatum", format!("paper={}", id))),
            ("identifiers", list_url("instance_identifier", format!("paper={}", id))),
            ("identities", list_url("paper_identity", format!("instance={}", id))),
        ]
    }
}

pub struct InstanceMetadata;

impl Resource for InstanceMetadata {
    type Entity = InstanceMetadatumEntity;
    type Model = InstanceMetadatum;
    type ActiveModel = InstanceMetadatumActiveModel;
    type Column = InstanceMetadatumColumn;

    const PATH: &'static str = "instance_metadatum";
    const CORPUS_LINKS: &'static [CorpusLink] = &[PAPER_LINK];
    const FROZEN: &'static [&'static str] = CORPUS_SCOPED;
    const NAME: &'static str = "InstanceMetadatum";
    const FILTERS: &'static [FieldFilter] = &[
        filter("id", "id", FilterKind::Integer),
        filter("corpus", "corpus_id", FilterKind::Integer),
        filter("paper", "paper_id", FilterKind::Integer),
        filter("name", "name", FilterKind::Exact),
        filter("value", "value", FilterKind::Contains),
    ];
    const OWNED: bool = true;
    const TIMESTAMPED: bool = true;
}

pub struct InstanceIdentifiers;

impl Resource for InstanceIdentifiers {
    type Entity = InstanceIdentifierEntity;
    type Model = InstanceIdentifier;
    type ActiveModel = InstanceIdentifierActiveModel;
    type Column = InstanceIdentifierColumn;

    const PATH: &'static str = "instance_identifier";
    const CORPUS_LINKS: &'static [CorpusLink] = &[PAPER_LINK];
    const FROZEN: &'static [&'static str] = CORPUS_SCOPED;
    const NAME: &'static str = "InstanceIdentifier";
    const FILTERS: &'static [FieldFilter] = &[
        filter("id", "id", FilterKind::Integer),
        filter("corpus", "corpus_id", FilterKind::Integer),
        filter("paper", "paper_id", FilterKind::Integer),
        filter("name", "name", FilterKind::Exact),
        filter("value", "value", FilterKind::Exact),
    ];
    const OWNED: bool = true;
    const TIMESTAMPED: bool = true;
}

// ============================================================================
// Authors and institutions
// ============================================================================

pub struct Authors;

impl Resource for Authors {
    type Entity = AuthorEntity;
    type Model = Author;
    type ActiveModel = AuthorActiveModel;
    type Column = AuthorColumn;

    const PATH: &'static str = "author";
    const NAME: &'static str = "Author";
    const FILTERS: &'static [FieldFilter] = &[
        filter("id", "id", FilterKind::Integer),
        filter("first_name", "first_name", FilterKind::Contains),
        filter("last_name", "last_name", FilterKind::Contains),
        filter("identifier", "identifier", FilterKind::Exact),
    ];
    const OWNED: bool = false;
    const TIMESTAMPED: bool = false;

    fn links(id: i32) -> Vec<(&'static str, String)> {
        vec![
            ("instantiations", list_url("author_identity", format!("author={}", id))),
            ("affiliations", list_url("affiliation", format!("author={}", id))),
        ]
    }
}

pub struct AuthorInstances;

impl Resource for AuthorInstances {
    type Entity = AuthorInstanceEntity;
    type Model = AuthorInstance;
    type ActiveModel = AuthorInstanceActiveModel;
    type Column = AuthorInstanceColumn;

    const PATH: &'static str = "author_instance";
    const CORPUS_LINKS: &'static [CorpusLink] = &[PAPER_LINK];
    const FROZEN: &'static [&'static str] = CORPUS_SCOPED;
    const NAME: &'static str = "AuthorInstance";
    const FILTERS: &'static [FieldFilter] = &[
        filter("id", "id", FilterKind::Integer),
        filter("corpus", "corpus_id", FilterKind::Integer),
        filter("paper", "paper_id", FilterKind::Integer),
        filter("first_name", "first_name", FilterKind::Contains),
        filter("last_name", "last_name", FilterKind::Contains),
    ];
    const OWNED: bool = true;
    const TIMESTAMPED: bool = true;

    fn links(id: i32) -> Vec<(&'static str, String)> {
        vec![
            ("affiliations", list_url("affiliation_instance", format!("author={}", id))),
            ("identities", list_url("author_identity", format!("instance={}", id))),
        ]
    }
}

pub struct Institutions;

impl Resource for Institutions {
    type Entity = InstitutionEntity;
    type Model = Institution;
    type ActiveModel = InstitutionActiveModel;
    type Column = InstitutionColumn;

    const PATH: &'static str = "institution";
    const NAME: &'static str = "Institution";
    const FILTERS: &'static [FieldFilter] = &[
        filter("id", "id", FilterKind::Integer),
        filter("name", "name", FilterKind::Contains),
        filter("city", "city", FilterKind::Contains),
        filter("state", "state", FilterKind::Exact),
        filter("zip", "zip", FilterKind::Exact),
        filter("country", "country", FilterKind::Contains),
    ];
    const OWNED: bool = false;
    const TIMESTAMPED: bool = false;

    fn links(id: i32) -> Vec<(&'static str, String)> {
        vec![
            ("instantiations", list_url("institution_identity", format!("institution={}", id))),
            ("affiliates", list_url("affiliation", format!("institution={}", id))),
        ]
    }
}

pub struct InstitutionInstances;

impl Resource for InstitutionInstances {
    type Entity = InstitutionInstanceEntity;
    type Model = InstitutionInstance;
    type ActiveModel = InstitutionInstanceActiveModel;
    type Column = InstitutionInstanceColumn;

    const PATH: &'static str = "institution_instance";
    const CORPUS_LINKS: &'static [CorpusLink] = &[PAPER_LINK];
    const FROZEN: &'static [&'static str] = CORPUS_SCOPED;
    const NAME: &'static str = "InstitutionInstance";
    const FILTERS: &'static [FieldFilter] = &[
        filter("id", "id", FilterKind::Integer),
        filter("corpus", "corpus_id", FilterKind::Integer),
        filter("paper", "paper_id", FilterKind::Integer),
        filter("name", "name", FilterKind::Contains),
        filter("department", "department", FilterKind::Contains),
        filter("address", "address", FilterKind::Contains),
        filter("city", "city", FilterKind::Contains),
        filter("state", "state", FilterKind::Exact),
        filter("zip", "zip", FilterKind::Exact),
        filter("country", "country", FilterKind::Contains),
    ];
    const OWNED: bool = true;
    const TIMESTAMPED: bool = true;

    fn links(id: i32) -> Vec<(&'static str, String)> {
        vec![
            ("affiliations", list_url("affiliation_instance", format!("institution={}", id))),
            ("identities", list_url("institution_identity", format!("instance={}", id))),
        ]
    }
}

pub struct AffiliationInstances;

impl Resource for AffiliationInstances {
    type Entity = AffiliationInstanceEntity;
    type Model = AffiliationInstance;
    type ActiveModel = AffiliationInstanceActiveModel;
    type Column = AffiliationInstanceColumn;

    const PATH: &'static str = "affiliation_instance";
    const CORPUS_LINKS: &'static [CorpusLink] = &[
        PAPER_LINK,
        corpus_link("author_id", InstanceTable::Author),
        corpus_link("institution_id", InstanceTable::Institution),
    ];
    const FROZEN: &'static [&'static str] = CORPUS_SCOPED;
    const NAME: &'static str = "AffiliationInstance";
    const FILTERS: &'static [FieldFilter] = &[
        filter("id", "id", FilterKind::Integer),
        filter("corpus", "corpus_id", FilterKind::Integer),
        filter("paper", "paper_id", FilterKind::Integer),
        filter("author", "author_id", FilterKind::Integer),
        filter("institution", "institution_id", FilterKind::Integer),
        filter("confidence", "confidence", FilterKind::AtLeast),
    ];
    const OWNED: bool = true;
    const TIMESTAMPED: bool = true;

    fn validate(row: &mut Map<String, Value>) -> Result<()> {
        validate_confidence(row)
    }
}

// ============================================================================
// Identity assertions (append-only)
// ============================================================================

const ASSERTION_FILTERS_TAIL: [FieldFilter; 3] = [
    filter("id", "id", FilterKind::Integer),
    filter("model", "model_id", FilterKind::Integer),
    filter("confidence", "confidence", FilterKind::AtLeast),
];

pub struct AuthorIdentities;

impl Resource for AuthorIdentities {
    type Entity = AuthorIdentityEntity;
    type Model = AuthorIdentity;
    type ActiveModel = AuthorIdentityActiveModel;
    type Column = AuthorIdentityColumn;

    const PATH: &'static str = "author_identity";
    const NAME: &'static str = "AuthorIdentity";
    const FILTERS: &'static [FieldFilter] = &[
        ASSERTION_FILTERS_TAIL[0],
        ASSERTION_FILTERS_TAIL[1],
        ASSERTION_FILTERS_TAIL[2],
        filter("author", "author_id", FilterKind::Integer),
        filter("instance", "instance_id", FilterKind::Integer),
    ];
    const OWNED: bool = false;
    const TIMESTAMPED: bool = false;
    const IMMUTABLE: bool = true;

    fn validate(row: &mut Map<String, Value>) -> Result<()> {
        validate_confidence(row)
    }
}

pub struct InstitutionIdentities;

impl Resource for InstitutionIdentities {
    type Entity = InstitutionIdentityEntity;
    type Model = InstitutionIdentity;
    type ActiveModel = InstitutionIdentityActiveModel;
    type Column = InstitutionIdentityColumn;

    const PATH: &'static str = "institution_identity";
    const NAME: &'static str = "InstitutionIdentity";
    const FILTERS: &'static [FieldFilter] = &[
        ASSERTION_FILTERS_TAIL[0],
        ASSERTION_FILTERS_TAIL[1],
        ASSERTION_FILTERS_TAIL[2],
        filter("institution", "institution_id", FilterKind::Integer),
        filter("instance", "instance_id", FilterKind::Integer),
    ];
    const OWNED: bool = false;
    const TIMESTAMPED: bool = false;
    const IMMUTABLE: bool = true;

    fn validate(row: &mut Map<String, Value>) -> Result<()> {
        validate_confidence(row)
    }
}

pub struct PaperIdentities;

impl Resource for PaperIdentities {
    type Entity = PaperIdentityEntity;
    type Model = PaperIdentity;
    type ActiveModel = PaperIdentityActiveModel;
    type Column = PaperIdentityColumn;

    const PATH: &'static str = "paper_identity";
    const NAME: &'static str = "PaperIdentity";
    const FILTERS: &'static [FieldFilter] = &[
        ASSERTION_FILTERS_TAIL[0],
        ASSERTION_FILTERS_TAIL[1],
        ASSERTION_FILTERS_TAIL[2],
        filter("paper", "paper_id", FilterKind::Integer),
        filter("instance", "instance_id", FilterKind::Integer),
    ];
    const OWNED: bool = false;
    const TIMESTAMPED: bool = false;
    const IMMUTABLE: bool = true;

    fn validate(row: &mut Map<String, Value>) -> Result<()> {
        validate_confidence(row)
    }
}

pub struct Affiliations;

impl Resource for Affiliations {
    type Entity = AffiliationEntity;
    type Model = Affiliation;
    type ActiveModel = AffiliationActiveModel;
    type Column = AffiliationColumn;

    const PATH: &'static str = "affiliation";
    const NAME: &'static str = "Affiliation";
    const FILTERS: &'static [FieldFilter] = &[
        ASSERTION_FILTERS_TAIL[0],
        ASSERTION_FILTERS_TAIL[1],
        ASSERTION_FILTERS_TAIL[2],
        filter("author", "author_id", FilterKind::Integer),
        filter("institution", "institution_id", FilterKind::Integer),
    ];
    const OWNED: bool = false;
    const TIMESTAMPED: bool = false;
    const IMMUTABLE: bool = true;

    fn validate(row: &mut Map<String, Value>) -> Result<()> {
        validate_confidence(row)
    }
}
