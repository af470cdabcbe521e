//! Record readers
//!
//! Both readers are lazy iterators so a large export is never held in memory.

mod jsonl;
mod wos;

pub use jsonl::JsonLinesReader;
pub use wos::WosReader;

use crate::errors::ImportError;
use crate::record::BibRecord;
use clap::ValueEnum;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub type Records = Box<dyn Iterator<Item = Result<BibRecord, ImportError>> + Send>;

/// Input format of an import file
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecordFormat {
    /// `.txt` files are read as Web of Science, anything else as JSON Lines
    Auto,
    Jsonl,
    Wos,
}

impl RecordFormat {
    pub fn resolve(self, path: &Path) -> RecordFormat {
        match self {
            RecordFormat::Auto => {
                let is_txt = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
                if is_txt {
                    RecordFormat::Wos
                } else {
                    RecordFormat::Jsonl
                }
            }
            other => other,
        }
    }
}

/// Open `path` as a lazy record stream
pub fn open(path: &Path, format: RecordFormat) -> Result<Records, ImportError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ImportError::FileNotFound(path.display().to_string()),
        _ => ImportError::Io(e),
    })?;
    let input = BufReader::new(file);
    let source = path.display().to_string();

    Ok(match format.resolve(path) {
        RecordFormat::Wos => Box::new(WosReader::new(input, source)),
        _ => Box::new(JsonLinesReader::new(input, source)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_format() {
        assert_eq!(RecordFormat::Auto.resolve(Path::new("savedrecs.TXT")), RecordFormat::Wos);
        assert_eq!(RecordFormat::Auto.resolve(Path::new("records.jsonl")), RecordFormat::Jsonl);
        assert_eq!(RecordFormat::Jsonl.resolve(Path::new("x.txt")), RecordFormat::Jsonl);
    }

    #[test]
    fn test_missing_file() {
        let err = open(Path::new("/nonexistent/records.jsonl"), RecordFormat::Auto).err();
        assert!(matches!(err, Some(ImportError::FileNotFound(_))));
    }
}
