//! Web of Science field-tagged export format
//!
//! Each field starts with a two-character tag; continuation lines are
//! indented by three spaces and a record ends with `ER`. Author names and
//! cited references are uppercased the way the export prints them in `CR`.

use crate::errors::ImportError;
use crate::record::{Address, AuthorName, BibRecord, ALL_AUTHORS};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::io::BufRead;

static TAG_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z][A-Z0-9])(?:\s(.*))?$").expect("valid regex"));
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").expect("valid regex"));
static VOLUME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^V(\d[\w-]*)$").expect("valid regex"));
static PAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^P([A-Z]?\d[\w-]*)$").expect("valid regex"));
static DOI: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^DOI\s+\[?([^\]]+)\]?$").expect("valid regex"));

/// Streaming reader over a WoS export
pub struct WosReader<R> {
    lines: std::io::Lines<R>,
    source: String,
    line_no: usize,
    fields: Vec<(String, Vec<String>)>,
}

impl<R: BufRead> WosReader<R> {
    pub fn new(input: R, source: impl Into<String>) -> Self {
        Self {
            lines: input.lines(),
            source: source.into(),
            line_no: 0,
            fields: Vec::new(),
        }
    }

    fn location(&self) -> String {
        format!("{}:{}", self.source, self.line_no)
    }
}

impl<R: BufRead> Iterator for WosReader<R> {
    type Item = Result<BibRecord, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => return Some(Err(e.into())),
                None if self.fields.is_empty() => return None,
                None => {
                    self.fields.clear();
                    return Some(Err(ImportError::malformed(self.location(), "record is missing ER")));
                }
            };
            self.line_no += 1;

            let line = raw.trim_start_matches('\u{feff}').trim_end();
            if line.trim().is_empty() {
                continue;
            }

            if line.starts_with("   ") {
                match self.fields.last_mut() {
                    Some((_, values)) => values.push(line.trim().to_string()),
                    None => {
                        return Some(Err(ImportError::malformed(
                            self.location(),
                            "continuation line outside a record",
                        )))
                    }
                }
                continue;
            }

            let Some(captures) = TAG_LINE.captures(line) else {
                return Some(Err(ImportError::malformed(
                    self.location(),
                    format!("unrecognised line {:?}", line),
                )));
            };
            let tag = &captures[1];
            let value = captures.get(2).map(|m| m.as_str().trim()).unwrap_or_default();

            match tag {
                "ER" => return Some(Ok(build_record(std::mem::take(&mut self.fields)))),
                "FN" | "VR" | "EF" if self.fields.is_empty() => continue,
                _ => self.fields.push((tag.to_string(), vec![value.to_string()])),
            }
        }
    }
}

fn joined(values: &[String]) -> Option<String> {
    let text = values.join(" ").trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn build_record(fields: Vec<(String, Vec<String>)>) -> BibRecord {
    let mut record = BibRecord::default();
    let mut short_names = Vec::new();
    let mut full_names = Vec::new();
    let mut address_lines = Vec::new();
    let mut references = Vec::new();

    for (tag, values) in fields {
        match tag.as_str() {
            "AU" => short_names = values,
            "AF" => full_names = values,
            "TI" => record.title = joined(&values),
            "SO" => record.journal = joined(&values),
            "PY" => record.date = values.first().and_then(|v| v.trim().parse().ok()),
            "VL" => record.volume = joined(&values),
            "IS" => record.issue = joined(&values),
            "AB" => record.abstract_text = joined(&values),
            "DI" => record.doi = joined(&values),
            "SN" => record.issn = joined(&values),
            "BN" => record.isbn = joined(&values),
            "C1" => address_lines = values,
            "CR" => references = values,
            "UT" => {
                if let Some(id) = joined(&values) {
                    record.extra.insert("wosid".to_string(), Value::String(id));
                }
            }
            _ => {
                let value = match values.len() {
                    1 => Value::String(values[0].clone()),
                    _ => Value::from(values),
                };
                record.extra.insert(tag, value);
            }
        }
    }

    let names = if full_names.is_empty() { short_names } else { full_names };
    record.authors = names.iter().filter_map(|n| parse_name(n)).collect();

    for line in &address_lines {
        let (authors, address) = parse_address(line);
        match authors {
            Some(authors) => {
                for author in authors {
                    record.addresses.entry(author.key()).or_default().push(address.clone());
                }
            }
            None => record
                .addresses
                .entry(ALL_AUTHORS.to_string())
                .or_default()
                .push(address),
        }
    }

    record.cited_references = references.iter().filter_map(|r| parse_cited_reference(r)).collect();
    record.ayjid = derive_ayjid(&record);
    record
}

/// `"Smith, John A."` or `"Smith J"`
fn parse_name(raw: &str) -> Option<AuthorName> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let (last, first) = match raw.split_once(',') {
        Some((last, first)) => (last, Some(first)),
        None => match raw.split_once(' ') {
            Some((last, first)) => (last, Some(first)),
            None => (raw, None),
        },
    };
    Some(AuthorName::new(
        last.trim().to_uppercase(),
        first.map(|f| f.trim().to_uppercase()),
    ))
}

/// `"[Smith, John; Doe, J] Univ X, Dept Y, Boston, MA 02115 USA."`
fn parse_address(raw: &str) -> (Option<Vec<AuthorName>>, Address) {
    let raw = raw.trim();
    let (authors, rest) = match raw.strip_prefix('[').and_then(|r| r.split_once(']')) {
        Some((names, rest)) => (
            Some(names.split(';').filter_map(parse_name).collect::<Vec<_>>()),
            rest,
        ),
        None => (None, raw),
    };

    let parts: Vec<String> = rest
        .trim()
        .trim_end_matches('.')
        .split(',')
        .map(|p| p.trim().to_uppercase())
        .filter(|p| !p.is_empty())
        .collect();

    let address = match parts.as_slice() {
        [] => Address::default(),
        [name] => Address {
            name: name.clone(),
            ..Address::default()
        },
        [name, middle @ .., last] => Address {
            name: name.clone(),
            country: Some(country_of(last)),
            lines: middle.to_vec(),
        },
    };
    (authors, address)
}

/// US addresses end with `"ST 12345 USA"`
fn country_of(last: &str) -> String {
    match last.rsplit_once(' ') {
        Some((_, tail)) if tail == "USA" => tail.to_string(),
        _ => last.to_string(),
    }
}

/// `"Smith J, 2001, NATURE, V410, P100, DOI 10.1038/35065725"`
fn parse_cited_reference(raw: &str) -> Option<BibRecord> {
    let mut record = BibRecord::default();
    let mut seen_year = false;

    for (i, token) in raw.split(',').map(str::trim).filter(|t| !t.is_empty()).enumerate() {
        if YEAR.is_match(token) && record.date.is_none() {
            record.date = token.parse().ok();
            seen_year = true;
        } else if let Some(c) = VOLUME.captures(token) {
            record.volume = Some(c[1].to_string());
        } else if let Some(c) = PAGE.captures(token) {
            record.extra.insert("page".to_string(), Value::String(c[1].to_string()));
        } else if let Some(c) = DOI.captures(token) {
            record.doi = Some(c[1].trim().to_string());
        } else if i == 0 && !seen_year {
            record.authors.extend(parse_name(token));
        } else if record.journal.is_none() {
            record.journal = Some(token.to_uppercase());
        }
    }

    if record.authors.is_empty() && record.date.is_none() && record.journal.is_none() {
        return None;
    }
    record.ayjid = derive_ayjid(&record);
    Some(record)
}

/// `"<LAST> <F> <YEAR> <JOURNAL>"`
fn derive_ayjid(record: &BibRecord) -> Option<String> {
    let author = record.authors.first()?;
    let initial = author
        .first_name
        .as_deref()
        .and_then(|f| f.chars().next())
        .map(String::from);
    let year = record.year().map(|y| y.to_string());

    let parts: Vec<String> = [Some(author.last_name.clone()), initial, year, record.journal.clone()]
        .into_iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .collect();
    Some(parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const EXPORT: &str = "\u{feff}FN Thomson Reuters Web of Science
VR 1.0
PT J
AU Smith, J
   Doe, JA
AF Smith, John
   Doe, Jane A.
TI Citation networks in
   the life sciences
SO JOURNAL OF THINGS
PY 2001
VL 12
IS 3
DI 10.1000/things.12
C1 [Smith, John; Doe, Jane A.] Univ Arizona, Sch Life Sci, Tempe, AZ 85287 USA.
   [Doe, Jane A.] Max Planck Inst, Berlin, Germany.
CR Merton RK, 1968, SCIENCE, V159, P56, DOI 10.1126/science.159.3810.56
   [Anonymous], 1999, NATURE, V400, P1
DE networks; citation
UT WOS:000001
ER

PT J
AU Lee, K
TI Second record
C1 Univ Tokyo, Tokyo, Japan.
ER

EF
";

    fn read_all(input: &str) -> Vec<BibRecord> {
        WosReader::new(Cursor::new(input.to_string()), "export.txt")
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_reads_every_record() {
        let records = read_all(EXPORT);
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.title.as_deref(), Some("Citation networks in the life sciences"));
        assert_eq!(first.date, Some(2001));
        assert_eq!(first.doi.as_deref(), Some("10.1000/things.12"));
        assert_eq!(first.authors[1].key(), "DOE, JANE A.");
        assert_eq!(first.extra["wosid"], "WOS:000001");
        assert_eq!(first.extra["PT"], "J");
        assert_eq!(first.ayjid.as_deref(), Some("SMITH J 2001 JOURNAL OF THINGS"));
    }

    #[test]
    fn test_addresses_are_assigned_to_named_authors() {
        let records = read_all(EXPORT);
        let first = &records[0];

        let smith = &first.addresses["SMITH, JOHN"];
        assert_eq!(smith.len(), 1);
        assert_eq!(smith[0].name, "UNIV ARIZONA");
        assert_eq!(smith[0].country.as_deref(), Some("USA"));
        assert_eq!(smith[0].lines, vec!["SCH LIFE SCI", "TEMPE"]);

        assert_eq!(first.addresses["DOE, JANE A."].len(), 2);

        let second = &records[1];
        let shared = &second.addresses[ALL_AUTHORS];
        assert_eq!(shared[0].name, "UNIV TOKYO");
        assert_eq!(shared[0].country.as_deref(), Some("JAPAN"));
    }

    #[test]
    fn test_cited_references() {
        let records = read_all(EXPORT);
        let refs = &records[0].cited_references;
        assert_eq!(refs.len(), 2);

        assert_eq!(refs[0].authors[0].key(), "MERTON, RK");
        assert_eq!(refs[0].date, Some(1968));
        assert_eq!(refs[0].journal.as_deref(), Some("SCIENCE"));
        assert_eq!(refs[0].volume.as_deref(), Some("159"));
        assert_eq!(refs[0].doi.as_deref(), Some("10.1126/science.159.3810.56"));
        assert_eq!(refs[0].extra["page"], "56");
        assert_eq!(refs[0].ayjid.as_deref(), Some("MERTON R 1968 SCIENCE"));

        assert_eq!(refs[1].authors[0].last_name, "[ANONYMOUS]");
    }

    #[test]
    fn test_unterminated_record_is_an_error() {
        let mut reader = WosReader::new(Cursor::new("PT J\nTI Lost\n"), "cut.txt");
        assert!(matches!(reader.next(), Some(Err(ImportError::MalformedRecord { .. }))));
        assert!(reader.next().is_none());
    }
}
