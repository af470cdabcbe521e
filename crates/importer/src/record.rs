//! Parsed bibliographic records as handed to the importer

use bibstore_common::auth::content_checksum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Address-map key applying to every author of a record
pub const ALL_AUTHORS: &str = "__all__";

/// Fields never copied into instance metadata
const EXCLUDED_METADATA: [&str; 2] = ["citations", "citedReferences"];

/// Author name as printed on the paper
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorName {
    pub last_name: String,
    #[serde(default)]
    pub first_name: Option<String>,
}

impl AuthorName {
    pub fn new(last_name: impl Into<String>, first_name: Option<String>) -> Self {
        Self {
            last_name: last_name.into(),
            first_name: first_name.filter(|f| !f.trim().is_empty()),
        }
    }

    /// Key of this author in [`BibRecord::addresses`]: `"LAST, FIRST"`
    pub fn key(&self) -> String {
        match self.first_name.as_deref() {
            Some(first) if !first.is_empty() => format!("{}, {}", self.last_name, first),
            _ => self.last_name.clone(),
        }
    }
}

/// One institutional address of an author
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub lines: Vec<String>,
}

impl Address {
    pub fn joined_lines(&self) -> String {
        self.lines.join(", ")
    }

    /// Identity of the institution within one paper
    pub fn key(&self) -> (String, Option<String>, String) {
        (self.name.clone(), self.country.clone(), self.joined_lines())
    }
}

/// A parsed bibliographic record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BibRecord {
    /// Publication year
    #[serde(default)]
    pub date: Option<i32>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub journal: Option<String>,

    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub ayjid: Option<String>,
    #[serde(default)]
    pub issn: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,

    #[serde(default)]
    pub authors: Vec<AuthorName>,

    /// Addresses keyed by [`AuthorName::key`] or [`ALL_AUTHORS`]
    #[serde(default)]
    pub addresses: BTreeMap<String, Vec<Address>>,

    #[serde(default, rename = "citedReferences")]
    pub cited_references: Vec<BibRecord>,

    /// Every other field of the source record
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl BibRecord {
    pub fn title(&self) -> Option<&str> {
        present(&self.title)
    }

    pub fn volume(&self) -> Option<&str> {
        present(&self.volume)
    }

    pub fn issue(&self) -> Option<&str> {
        present(&self.issue)
    }

    pub fn abstract_text(&self) -> Option<&str> {
        present(&self.abstract_text)
    }

    pub fn journal(&self) -> Option<&str> {
        present(&self.journal)
    }

    /// Year, with 0 treated as unknown
    pub fn year(&self) -> Option<i32> {
        self.date.filter(|year| *year != 0)
    }

    /// Identifier rows: only the identifiers the record actually carries
    pub fn identifiers(&self) -> Vec<(&'static str, String)> {
        [
            ("doi", &self.doi),
            ("ayjid", &self.ayjid),
            ("issn", &self.issn),
            ("isbn", &self.isbn),
            ("uri", &self.uri),
        ]
        .into_iter()
        .filter_map(|(name, value)| present(value).map(|v| (name, v.to_string())))
        .collect()
    }

    /// Metadata rows: every remaining field, JSON-encoded
    pub fn metadata(&self) -> Result<Vec<(String, String)>, serde_json::Error> {
        let mut rows = Vec::new();
        if !self.authors.is_empty() {
            rows.push(("authors".to_string(), serde_json::to_string(&self.authors)?));
        }
        if !self.addresses.is_empty() {
            rows.push(("addresses".to_string(), serde_json::to_string(&self.addresses)?));
        }
        for (name, value) in &self.extra {
            if name.starts_with('_') || EXCLUDED_METADATA.contains(&name.as_str()) || value.is_null() {
                continue;
            }
            rows.push((name.clone(), serde_json::to_string(value)?));
        }
        Ok(rows)
    }

    /// Addresses that apply to `author`, falling back to the record-wide list
    pub fn addresses_of(&self, author: &AuthorName) -> Option<&[Address]> {
        self.addresses
            .get(&author.key())
            .or_else(|| self.addresses.get(ALL_AUTHORS))
            .map(Vec::as_slice)
            .filter(|list| !list.is_empty())
    }

    /// Fingerprint used to detect the same paper imported twice
    pub fn checksum(&self) -> String {
        let year = self.year().map(|y| y.to_string());
        let first_author = self.authors.first().map(AuthorName::key);
        content_checksum(&[
            self.title(),
            year.as_deref(),
            self.journal(),
            self.volume(),
            self.issue(),
            first_author.as_deref(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> BibRecord {
        serde_json::from_value(json!({
            "date": 2001,
            "title": "Networks of science",
            "journal": "NATURE",
            "doi": "10.1000/xyz",
            "issn": "",
            "authors": [{"last_name": "SMITH", "first_name": "JOHN"}, {"last_name": "DOE"}],
            "addresses": {
                "SMITH, JOHN": [{"name": "UNIV A", "country": "USA", "lines": ["DEPT B", "BOSTON"]}],
                "__all__": [{"name": "UNIV C"}]
            },
            "keywords": ["graphs", "citation"],
            "_private": 1,
            "citations": 3,
            "citedReferences": [{"title": "Older work", "date": 1990}]
        }))
        .unwrap()
    }

    #[test]
    fn test_decode_keeps_unknown_fields() {
        let record = sample();
        assert_eq!(record.year(), Some(2001));
        assert_eq!(record.cited_references.len(), 1);
        assert!(record.extra.contains_key("keywords"));
        assert!(!record.extra.contains_key("citedReferences"));
    }

    #[test]
    fn test_identifiers_skip_empty_values() {
        let ids = sample().identifiers();
        assert_eq!(ids, vec![("doi", "10.1000/xyz".to_string())]);
    }

    #[test]
    fn test_metadata_excludes_private_and_citation_fields() {
        let names: Vec<String> = sample().metadata().unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["authors", "addresses", "keywords"]);
    }

    #[test]
    fn test_addresses_fall_back_to_all_authors() {
        let record = sample();
        let smith = &record.authors[0];
        let doe = &record.authors[1];
        assert_eq!(record.addresses_of(smith).unwrap()[0].name, "UNIV A");
        assert_eq!(record.addresses_of(doe).unwrap()[0].name, "UNIV C");
    }

    #[test]
    fn test_author_key() {
        assert_eq!(AuthorName::new("SMITH", Some("J".into())).key(), "SMITH, J");
        assert_eq!(AuthorName::new("SMITH", Some(" ".into())).key(), "SMITH");
    }

    #[test]
    fn test_checksum_ignores_non_citation_fields() {
        let a = sample();
        let mut b = sample();
        b.abstract_text = Some("different".into());
        assert_eq!(a.checksum(), b.checksum());
        b.volume = Some("12".into());
        assert_ne!(a.checksum(), b.checksum());
    }
}
