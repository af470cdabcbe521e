//! Identity assertions and their resolution
//!
//! Disambiguation models never overwrite each other. Each run appends
//! assertions linking instances (as they appear in one paper) to canonical
//! entities, and readers pick an answer per instance with a
//! [`ResolutionPolicy`].

use crate::db::models::{
    Affiliation, AuthorIdentity, DisambiguationModel, InstitutionIdentity, PaperIdentity,
};
use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A probability in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    /// Value stored when nobody estimated a confidence
    pub const UNSET: Confidence = Confidence(0.0);

    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || !(0.0..=1.0).contains(&value) {
            return Err(AppError::invalid_field(
                "confidence",
                format!("{} is outside [0, 1]", value),
            ));
        }
        Ok(Self(value))
    }

    /// Equal share among `options` candidates
    pub fn uniform(options: usize) -> Self {
        if options == 0 {
            Self::UNSET
        } else {
            Self(1.0 / options as f64)
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = AppError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for Confidence {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Confidence::new(value).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// Which table a batch of assertions targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    Author,
    Institution,
    Paper,
    /// Author instance to institution
    Affiliation,
}

impl IdentityKind {
    pub fn name(&self) -> &'static str {
        match self {
            IdentityKind::Author => "AuthorIdentity",
            IdentityKind::Institution => "InstitutionIdentity",
            IdentityKind::Paper => "PaperIdentity",
            IdentityKind::Affiliation => "Affiliation",
        }
    }
}

/// One assertion before it is stored
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewAssertion {
    pub instance_id: i32,
    pub entity_id: i32,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub methods: String,
}

/// Common view over the four assertion tables
pub trait IdentityAssertion {
    fn assertion_id(&self) -> i32;
    fn instance_id(&self) -> i32;
    fn entity_id(&self) -> i32;
    fn model_id(&self) -> i32;
    fn confidence(&self) -> f64;
}

macro_rules! identity_assertion {
    ($model:ty, $instance:ident, $entity:ident) => {
        impl IdentityAssertion for $model {
            fn assertion_id(&self) -> i32 {
                self.id
            }
            fn instance_id(&self) -> i32 {
                self.$instance
            }
            fn entity_id(&self) -> i32 {
                self.$entity
            }
            fn model_id(&self) -> i32 {
                self.model_id
            }
            fn confidence(&self) -> f64 {
                self.confidence
            }
        }
    };
}

identity_assertion!(AuthorIdentity, instance_id, author_id);
identity_assertion!(InstitutionIdentity, instance_id, institution_id);
identity_assertion!(PaperIdentity, instance_id, paper_id);
identity_assertion!(Affiliation, author_id, institution_id);

/// How conflicting assertions about one instance are settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// Largest confidence wins, newer models break ties
    #[default]
    HighestConfidence,
    /// Newest model wins, confidence breaks ties within it
    MostRecentModel,
}

/// Rank models oldest to newest by creation time, then id
pub fn model_recency(models: &[DisambiguationModel]) -> HashMap<i32, usize> {
    let mut ordered: Vec<&DisambiguationModel> = models.iter().collect();
    ordered.sort_by(|a, b| a.date_created.cmp(&b.date_created).then(a.id.cmp(&b.id)));
    ordered
        .into_iter()
        .enumerate()
        .map(|(rank, model)| (model.id, rank + 1))
        .collect()
}

/// Pick one assertion per instance
///
/// Models missing from `recency` rank below every known model. The final
/// tie-break is the assertion id, so the result is deterministic.
pub fn resolve<'a, A: IdentityAssertion>(
    assertions: &'a [A],
    policy: ResolutionPolicy,
    recency: &HashMap<i32, usize>,
) -> BTreeMap<i32, &'a A> {
    let rank = |a: &A| recency.get(&a.model_id()).copied().unwrap_or(0);
    let compare = |a: &A, b: &A| -> Ordering {
        let by_confidence = a.confidence().total_cmp(&b.confidence());
        let by_model = rank(a).cmp(&rank(b));
        let primary = match policy {
            ResolutionPolicy::HighestConfidence => by_confidence.then(by_model),
            ResolutionPolicy::MostRecentModel => by_model.then(by_confidence),
        };
        primary.then(a.assertion_id().cmp(&b.assertion_id()))
    };

    let mut chosen: BTreeMap<i32, &A> = BTreeMap::new();
    for assertion in assertions {
        chosen
            .entry(assertion.instance_id())
            .and_modify(|current| {
                if compare(assertion, current) == Ordering::Greater {
                    *current = assertion;
                }
            })
            .or_insert(assertion);
    }
    chosen
}
