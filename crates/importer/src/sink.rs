//! Where imported rows go

use crate::errors::ImportError;
use async_trait::async_trait;
use bibstore_common::db::Repository;
use bibstore_common::Resource;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Storage the importer writes to
///
/// Row ids are assigned by the importer, so a sink only needs to report the
/// largest stored id per table and append rows.
#[async_trait]
pub trait ImportSink: Send + Sync {
    async fn max_id<R: Resource>(&self) -> Result<Option<i32>, ImportError>;

    /// Append rows in the given order; returns the number written
    async fn insert_rows<R: Resource>(&self, rows: Vec<R::Model>) -> Result<u64, ImportError>;
}

#[async_trait]
impl ImportSink for Repository {
    async fn max_id<R: Resource>(&self) -> Result<Option<i32>, ImportError> {
        Repository::max_id::<R>(self).await.map_err(Into::into)
    }

    async fn insert_rows<R: Resource>(&self, rows: Vec<R::Model>) -> Result<u64, ImportError> {
        Repository::insert_rows::<R>(self, rows).await.map_err(Into::into)
    }
}

/// Keeps rows in memory as JSON; used for dry runs
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: Mutex<BTreeMap<&'static str, Vec<Value>>>,
    writes: Mutex<Vec<(&'static str, usize)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows stored for the model named `name`
    pub fn rows(&self, name: &str) -> Vec<Value> {
        let tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables.get(name).cloned().unwrap_or_default()
    }

    pub fn count(&self, name: &str) -> usize {
        let tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables.get(name).map(Vec::len).unwrap_or_default()
    }

    /// Every non-empty insert in call order: (model, rows)
    pub fn writes(&self) -> Vec<(&'static str, usize)> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Pretend `name` already holds rows up to `max_id`
    pub fn preload(&self, name: &'static str, max_id: i32) {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables
            .entry(name)
            .or_default()
            .push(serde_json::json!({ "id": max_id }));
    }
}

#[async_trait]
impl ImportSink for MemorySink {
    async fn max_id<R: Resource>(&self) -> Result<Option<i32>, ImportError> {
        let tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        Ok(tables.get(R::NAME).and_then(|rows| {
            rows.iter()
                .filter_map(|row| row.get("id").and_then(Value::as_i64))
                .max()
                .and_then(|id| i32::try_from(id).ok())
        }))
    }

    async fn insert_rows<R: Resource>(&self, rows: Vec<R::Model>) -> Result<u64, ImportError> {
        let encoded = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let count = encoded.len();

        self.tables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(R::NAME)
            .or_default()
            .extend(encoded);
        self.writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((R::NAME, count));

        Ok(count as u64)
    }
}
