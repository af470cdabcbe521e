//! bibstore importer
//!
//! Loads parsed bibliographic records into a new corpus:
//! - `reader`: lazy JSON Lines and Web of Science record streams
//! - `record`: the record shape handed to the importer
//! - `handler`: key allocation, row building and batched writes
//! - `sink`: where rows are written (database or memory)

pub mod errors;
pub mod handler;
pub mod reader;
pub mod record;
pub mod sink;

pub use errors::ImportError;
pub use handler::{CorpusHandler, ImportOptions, RunSummary};
pub use reader::RecordFormat;
pub use record::BibRecord;
pub use sink::{ImportSink, MemorySink};
