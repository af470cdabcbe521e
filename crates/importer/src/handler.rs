//! Corpus import run
//!
//! Turns a stream of [`BibRecord`]s into instance rows. Keys come from a
//! per-run [`IdAllocator`], so rows of different tables can reference each
//! other while they are still buffered; buffers are written in foreign-key
//! order whenever the paper buffer reaches the batch size.

use crate::errors::ImportError;
use crate::record::{Address, BibRecord};
use crate::sink::ImportSink;
use bibstore_common::db::ids::IdAllocator;
use bibstore_common::db::models::{
    AffiliationInstance, AuthorInstance, Corpus, CorpusSource, InstanceIdentifier,
    InstanceMetadatum, InstitutionInstance, PaperInstance,
};
use bibstore_common::db::resource::{
    AffiliationInstances, AuthorInstances, Corpora, InstanceIdentifiers, InstanceMetadata,
    InstitutionInstances, PaperInstances,
};
use bibstore_common::identity::Confidence;
use bibstore_common::metrics;
use bibstore_common::Resource;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Parameters of one import run
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub label: String,
    pub source: CorpusSource,
    /// Buffered paper rows that trigger a flush
    pub batch_size: usize,
    /// User recorded as `created_by` on every row
    pub owner_id: i32,
}

/// What a finished run wrote
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub corpus_id: i32,
    pub records: usize,
    pub flushes: usize,
    pub created: BTreeMap<&'static str, u64>,
}

/// Rows built but not yet written
#[derive(Debug, Default)]
struct Hoppers {
    papers: Vec<PaperInstance>,
    identifiers: Vec<InstanceIdentifier>,
    metadata: Vec<InstanceMetadatum>,
    authors: Vec<AuthorInstance>,
    institutions: Vec<InstitutionInstance>,
    affiliations: Vec<AffiliationInstance>,
}

impl Hoppers {
    fn is_empty(&self) -> bool {
        self.papers.is_empty()
            && self.identifiers.is_empty()
            && self.metadata.is_empty()
            && self.authors.is_empty()
            && self.institutions.is_empty()
            && self.affiliations.is_empty()
    }
}

/// Imports records into one new corpus
pub struct CorpusHandler<S> {
    sink: S,
    options: ImportOptions,
    corpus: Corpus,
    ids: IdAllocator,
    hoppers: Hoppers,
    summary: RunSummary,
    started: DateTime<Utc>,
}

impl<S: ImportSink> CorpusHandler<S> {
    /// Seed key counters from the sink and create the corpus row
    #[instrument(skip(sink, options), fields(label = %options.label))]
    pub async fn new(sink: S, options: ImportOptions) -> Result<Self, ImportError> {
        if options.batch_size == 0 {
            return Err(ImportError::Config("batch size must be positive".to_string()));
        }

        let mut ids = IdAllocator::new();
        ids.seed(Corpora::NAME, sink.max_id::<Corpora>().await?);
        ids.seed(PaperInstances::NAME, sink.max_id::<PaperInstances>().await?);
        ids.seed(InstanceIdentifiers::NAME, sink.max_id::<InstanceIdentifiers>().await?);
        ids.seed(InstanceMetadata::NAME, sink.max_id::<InstanceMetadata>().await?);
        ids.seed(AuthorInstances::NAME, sink.max_id::<AuthorInstances>().await?);
        ids.seed(InstitutionInstances::NAME, sink.max_id::<InstitutionInstances>().await?);
        ids.seed(AffiliationInstances::NAME, sink.max_id::<AffiliationInstances>().await?);

        let started = Utc::now();
        let corpus = Corpus {
            id: ids.allocate(Corpora::NAME),
            source: options.source.as_str().to_string(),
            label: options.label.clone(),
            date_created: started,
            created_by_id: options.owner_id,
        };
        sink.insert_rows::<Corpora>(vec![corpus.clone()]).await?;
        info!(corpus_id = corpus.id, source = %options.source, "Created corpus");

        let summary = RunSummary {
            corpus_id: corpus.id,
            ..RunSummary::default()
        };

        Ok(Self {
            sink,
            options,
            corpus,
            ids,
            hoppers: Hoppers::default(),
            summary,
            started,
        })
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume every record, then flush whatever is left
    #[instrument(skip(self, records), fields(corpus_id = self.corpus.id, batch_size = self.options.batch_size))]
    pub async fn run<I>(&mut self, records: I) -> Result<RunSummary, ImportError>
    where
        I: IntoIterator<Item = Result<BibRecord, ImportError>>,
    {
        for record in records {
            let record = record?;
            self.handle_record(&record)?;
            metrics::record_import_record(self.options.source.as_str());

            if self.hoppers.papers.len() >= self.options.batch_size {
                self.flush().await?;
            }
        }

        if !self.hoppers.is_empty() {
            self.flush().await?;
        }

        info!(
            records = self.summary.records,
            flushes = self.summary.flushes,
            "Import finished"
        );
        Ok(self.summary.clone())
    }

    /// Build the rows of one record and of the references it cites
    pub fn handle_record(&mut self, record: &BibRecord) -> Result<i32, ImportError> {
        let paper_id = self.handle_paper(record, None)?;
        for cited in &record.cited_references {
            self.handle_paper(cited, Some(paper_id))?;
        }
        self.summary.records += 1;
        Ok(paper_id)
    }

    /// Buffer one paper instance with its identifiers, metadata and authors.
    /// Nested references of `record` are not followed.
    fn handle_paper(&mut self, record: &BibRecord, cited_by: Option<i32>) -> Result<i32, ImportError> {
        let paper_id = self.ids.allocate(PaperInstances::NAME);
        self.hoppers.papers.push(PaperInstance {
            id: paper_id,
            corpus_id: self.corpus.id,
            created_by_id: self.options.owner_id,
            date_created: self.started,
            checksum: Some(record.checksum()),
            publication_date: record.year(),
            title: record.title().map(str::to_string),
            volume: record.volume().map(str::to_string),
            issue: record.issue().map(str::to_string),
            journal: record.journal().map(str::to_string),
            abstract_text: record.abstract_text().map(str::to_string),
            concrete: cited_by.is_none(),
            cited_by_id: cited_by,
        });

        for (name, value) in record.identifiers() {
            let id = self.ids.allocate(InstanceIdentifiers::NAME);
            self.hoppers.identifiers.push(InstanceIdentifier {
                id,
                corpus_id: self.corpus.id,
                created_by_id: self.options.owner_id,
                date_created: self.started,
                paper_id,
                name: name.to_string(),
                value,
            });
        }

        for (name, value) in record.metadata()? {
            let id = self.ids.allocate(InstanceMetadata::NAME);
            self.hoppers.metadata.push(InstanceMetadatum {
                id,
                corpus_id: self.corpus.id,
                created_by_id: self.options.owner_id,
                date_created: self.started,
                paper_id,
                name,
                value,
            });
        }

        self.handle_authors(record, paper_id);
        Ok(paper_id)
    }

    /// One institution instance per distinct address on the paper, one
    /// author instance per author, and affiliations spreading each
    /// author's confidence evenly over their addresses
    fn handle_authors(&mut self, record: &BibRecord, paper_id: i32) {
        let mut institutions: BTreeMap<(String, Option<String>, String), i32> = BTreeMap::new();
        for address in record.addresses.values().flatten() {
            let key = address.key();
            if !institutions.contains_key(&key) {
                let id = self.push_institution(address, paper_id);
                institutions.insert(key, id);
            }
        }

        for author in &record.authors {
            let author_id = self.ids.allocate(AuthorInstances::NAME);
            self.hoppers.authors.push(AuthorInstance {
                id: author_id,
                corpus_id: self.corpus.id,
                created_by_id: self.options.owner_id,
                date_created: self.started,
                paper_id,
                first_name: author.first_name.clone(),
                last_name: author.last_name.clone(),
            });

            let Some(addresses) = record.addresses_of(author) else {
                debug!(author = %author.key(), "No address for author");
                continue;
            };

            let mut mapped: Vec<i32> = Vec::with_capacity(addresses.len());
            for address in addresses {
                if let Some(&id) = institutions.get(&address.key()) {
                    if !mapped.contains(&id) {
                        mapped.push(id);
                    }
                }
            }

            let confidence = Confidence::uniform(mapped.len());
            for institution_id in mapped {
                let id = self.ids.allocate(AffiliationInstances::NAME);
                self.hoppers.affiliations.push(AffiliationInstance {
                    id,
                    corpus_id: self.corpus.id,
                    created_by_id: self.options.owner_id,
                    date_created: self.started,
                    paper_id,
                    author_id,
                    institution_id,
                    confidence: confidence.value(),
                });
            }
        }
    }

    fn push_institution(&mut self, address: &Address, paper_id: i32) -> i32 {
        let id = self.ids.allocate(InstitutionInstances::NAME);
        self.hoppers.institutions.push(InstitutionInstance {
            id,
            corpus_id: self.corpus.id,
            created_by_id: self.options.owner_id,
            date_created: self.started,
            paper_id,
            name: address.name.clone(),
            department: None,
            address: address.joined_lines(),
            state: None,
            city: None,
            zip: None,
            country: address.country.clone(),
        });
        id
    }

    /// Write every buffer in foreign-key order
    async fn flush(&mut self) -> Result<(), ImportError> {
        let started = Instant::now();
        let hoppers = std::mem::take(&mut self.hoppers);

        self.write::<PaperInstances>(hoppers.papers).await?;
        self.write::<InstanceIdentifiers>(hoppers.identifiers).await?;
        self.write::<InstanceMetadata>(hoppers.metadata).await?;
        self.write::<AuthorInstances>(hoppers.authors).await?;
        self.write::<InstitutionInstances>(hoppers.institutions).await?;
        self.write::<AffiliationInstances>(hoppers.affiliations).await?;

        self.summary.flushes += 1;
        metrics::record_flush(started.elapsed().as_secs_f64());
        debug!(batch = self.summary.flushes, "Flushed batch");
        Ok(())
    }

    async fn write<R: Resource>(&mut self, rows: Vec<R::Model>) -> Result<(), ImportError> {
        let created = if rows.is_empty() {
            0
        } else {
            self.sink.insert_rows::<R>(rows).await?
        };

        println!("Created {} instances of {}", created, R::NAME);
        info!(model = R::NAME, created, batch = self.summary.flushes + 1, "Created instances");
        metrics::record_rows_imported(R::NAME, created);
        *self.summary.created.entry(R::NAME).or_default() += created;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use serde_json::json;

    fn options(batch_size: usize) -> ImportOptions {
        ImportOptions {
            label: "test corpus".to_string(),
            source: CorpusSource::Wos,
            batch_size,
            owner_id: 1,
        }
    }

    fn record(value: serde_json::Value) -> BibRecord {
        serde_json::from_value(value).unwrap()
    }

    fn plain(title: &str) -> Result<BibRecord, ImportError> {
        Ok(record(json!({ "title": title, "date": 2000 })))
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_rejected() {
        let err = CorpusHandler::new(MemorySink::new(), options(0)).await.err();
        assert!(matches!(err, Some(ImportError::Config(_))));
    }

    #[tokio::test]
    async fn test_keys_continue_after_existing_rows() {
        let sink = MemorySink::new();
        sink.preload("Corpus", 4);
        sink.preload("PaperInstance", 41);

        let mut handler = CorpusHandler::new(sink, options(10)).await.unwrap();
        assert_eq!(handler.corpus().id, 5);
        assert_eq!(handler.handle_record(&plain("a").unwrap()).unwrap(), 42);
    }

    #[tokio::test]
    async fn test_flush_count_and_final_partial_batch() {
        let mut handler = CorpusHandler::new(MemorySink::new(), options(3)).await.unwrap();
        let records: Vec<_> = (0..7).map(|i| plain(&format!("paper {}", i))).collect();
        let summary = handler.run(records).await.unwrap();

        assert_eq!(summary.records, 7);
        assert_eq!(summary.flushes, 3);
        assert_eq!(summary.created["PaperInstance"], 7);

        let per_flush: Vec<usize> = handler
            .sink()
            .writes()
            .into_iter()
            .filter(|(name, _)| *name == PaperInstances::NAME)
            .map(|(_, rows)| rows)
            .collect();
        assert_eq!(per_flush, vec![3, 3, 1]);
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_empty_flush() {
        let mut handler = CorpusHandler::new(MemorySink::new(), options(2)).await.unwrap();
        let records: Vec<_> = (0..4).map(|i| plain(&format!("paper {}", i))).collect();
        assert_eq!(handler.run(records).await.unwrap().flushes, 2);
    }

    #[tokio::test]
    async fn test_institutions_deduplicated_and_confidence_split() {
        let mut handler = CorpusHandler::new(MemorySink::new(), options(10)).await.unwrap();
        let paper = record(json!({
            "title": "Shared addresses",
            "authors": [
                {"last_name": "SMITH", "first_name": "J"},
                {"last_name": "DOE", "first_name": "A"},
                {"last_name": "ROE"}
            ],
            "addresses": {
                "SMITH, J": [
                    {"name": "UNIV A", "country": "USA", "lines": ["BOSTON"]},
                    {"name": "UNIV B", "lines": ["PARIS"]}
                ],
                "DOE, A": [{"name": "UNIV A", "country": "USA", "lines": ["BOSTON"]}]
            }
        }));
        handler.handle_record(&paper).unwrap();

        let hoppers = &handler.hoppers;
        assert_eq!(hoppers.institutions.len(), 2);
        assert_eq!(hoppers.authors.len(), 3);

        let smith = hoppers.authors[0].id;
        let doe = hoppers.authors[1].id;
        let confidences = |author: i32| -> Vec<f64> {
            hoppers
                .affiliations
                .iter()
                .filter(|a| a.author_id == author)
                .map(|a| a.confidence)
                .collect()
        };
        assert_eq!(confidences(smith), vec![0.5, 0.5]);
        assert_eq!(confidences(doe), vec![1.0]);
        assert!(confidences(hoppers.authors[2].id).is_empty());

        let institutions_of = |author: i32| -> Vec<i32> {
            hoppers
                .affiliations
                .iter()
                .filter(|a| a.author_id == author)
                .map(|a| a.institution_id)
                .collect()
        };
        let univ_a = hoppers
            .institutions
            .iter()
            .find(|i| i.name == "UNIV A")
            .map(|i| i.id)
            .unwrap();
        assert_eq!(institutions_of(doe), vec![univ_a]);
        assert!(institutions_of(smith).contains(&univ_a));
    }

    #[tokio::test]
    async fn test_repeated_address_counts_once() {
        let mut handler = CorpusHandler::new(MemorySink::new(), options(10)).await.unwrap();
        let paper = record(json!({
            "authors": [{"last_name": "SMITH"}],
            "addresses": {"SMITH": [{"name": "UNIV A"}, {"name": "UNIV A"}]}
        }));
        handler.handle_record(&paper).unwrap();

        assert_eq!(handler.hoppers.institutions.len(), 1);
        assert_eq!(handler.hoppers.affiliations.len(), 1);
        assert_eq!(handler.hoppers.affiliations[0].confidence, 1.0);
    }

    #[tokio::test]
    async fn test_all_authors_fallback() {
        let mut handler = CorpusHandler::new(MemorySink::new(), options(10)).await.unwrap();
        let paper = record(json!({
            "authors": [{"last_name": "SMITH"}, {"last_name": "DOE"}],
            "addresses": {"__all__": [{"name": "UNIV A"}, {"name": "UNIV B"}, {"name": "UNIV C"}]}
        }));
        handler.handle_record(&paper).unwrap();

        assert_eq!(handler.hoppers.institutions.len(), 3);
        assert_eq!(handler.hoppers.affiliations.len(), 6);
        let third = Confidence::uniform(3).value();
        assert!(handler.hoppers.affiliations.iter().all(|a| a.confidence == third));
    }

    #[tokio::test]
    async fn test_cited_references_become_stubs_one_level_deep() {
        let mut handler = CorpusHandler::new(MemorySink::new(), options(10)).await.unwrap();
        let paper = record(json!({
            "title": "Citing paper",
            "citedReferences": [
                {"title": "Cited one", "authors": [{"last_name": "OLD"}]},
                {"title": "Cited two", "citedReferences": [{"title": "Too deep"}]}
            ]
        }));
        let parent = handler.handle_record(&paper).unwrap();

        let papers = &handler.hoppers.papers;
        assert_eq!(papers.len(), 3);
        assert!(papers[0].concrete);
        assert!(papers[1..].iter().all(|p| !p.concrete && p.cited_by_id == Some(parent)));
        assert_eq!(handler.hoppers.authors.len(), 1);
        assert_eq!(handler.summary.records, 1);
    }

    #[tokio::test]
    async fn test_identifiers_and_metadata_rows() {
        let mut handler = CorpusHandler::new(MemorySink::new(), options(10)).await.unwrap();
        let paper = record(json!({
            "title": "Identified",
            "doi": "10.1/abc",
            "uri": "",
            "keywords": ["a", "b"],
            "_internal": true
        }));
        handler.handle_record(&paper).unwrap();

        let identifiers = &handler.hoppers.identifiers;
        assert_eq!(identifiers.len(), 1);
        assert_eq!(identifiers[0].name, "doi");

        let metadata = &handler.hoppers.metadata;
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata[0].name, "keywords");
        assert_eq!(metadata[0].value, r#"["a","b"]"#);
    }

    #[tokio::test]
    async fn test_flush_writes_in_foreign_key_order() {
        let mut handler = CorpusHandler::new(MemorySink::new(), options(10)).await.unwrap();
        let records = vec![Ok(record(json!({
            "title": "Ordered",
            "doi": "10.1/x",
            "keywords": "k",
            "authors": [{"last_name": "SMITH"}],
            "addresses": {"__all__": [{"name": "UNIV A"}]}
        })))];
        let summary = handler.run(records).await.unwrap();
        assert_eq!(summary.flushes, 1);

        let order: Vec<&str> = handler.sink().writes().into_iter().map(|(name, _)| name).collect();
        assert_eq!(
            order,
            vec![
                "Corpus",
                "PaperInstance",
                "InstanceIdentifier",
                "InstanceMetadatum",
                "AuthorInstance",
                "InstitutionInstance",
                "AffiliationInstance",
            ]
        );
        let paper = &handler.sink().rows("PaperInstance")[0];
        assert_eq!(paper["corpus_id"], json!(handler.corpus().id));
    }

    #[tokio::test]
    async fn test_malformed_record_aborts_run() {
        let mut handler = CorpusHandler::new(MemorySink::new(), options(10)).await.unwrap();
        let records = vec![plain("ok"), Err(ImportError::malformed("input:2", "bad"))];
        let err = handler.run(records).await.err();
        assert!(matches!(err, Some(ImportError::MalformedRecord { .. })));
    }
}
