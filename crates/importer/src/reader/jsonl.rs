//! JSON Lines records: one `BibRecord` object per line

use crate::errors::ImportError;
use crate::record::BibRecord;
use std::io::BufRead;

/// Lazily decodes records; blank lines are skipped
pub struct JsonLinesReader<R> {
    lines: std::io::Lines<R>,
    source: String,
    line_no: usize,
}

impl<R: BufRead> JsonLinesReader<R> {
    pub fn new(input: R, source: impl Into<String>) -> Self {
        Self {
            lines: input.lines(),
            source: source.into(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for JsonLinesReader<R> {
    type Item = Result<BibRecord, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            return Some(serde_json::from_str(&line).map_err(|e| {
                ImportError::malformed(format!("{}:{}", self.source, self.line_no), e)
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_records_and_skips_blank_lines() {
        let input = "{\"title\": \"A\"}\n\n   \n{\"title\": \"B\", \"date\": 1999}\n";
        let records: Vec<BibRecord> = JsonLinesReader::new(Cursor::new(input), "mem")
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].date, Some(1999));
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let input = "{\"title\": \"A\"}\n{not json}\n";
        let mut reader = JsonLinesReader::new(Cursor::new(input), "records.jsonl");
        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(ImportError::MalformedRecord { location, .. }) => assert_eq!(location, "records.jsonl:2"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
