//! Record stores standing in for the backend.
//!
//! Every dataset the dashboard shows lives in a [`RecordStore`]. Records are
//! JSON objects with an integer `id` assigned by the store. Pages only reach
//! stores through the [`Backend`] they are handed at startup.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, trace};

/// One stored record.
pub type Record = Map<String, Value>;

/// Errors raised by a record store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No record with this id.
    #[error("{store}: no record with id {id}")]
    NotFound { store: String, id: u64 },

    /// The store does not exist.
    #[error("unknown store \"{0}\"")]
    UnknownStore(String),
}

/// One page of records plus the size of the filtered dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPage {
    pub records: Vec<Record>,
    pub total: usize,
}

/// CRUD access to one dataset.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store name (`donors`).
    fn name(&self) -> &str;

    /// Records matching `filter`, `limit` of them starting at `offset`.
    ///
    /// An empty filter matches everything. Otherwise a record matches when
    /// any string or number field contains the filter, ignoring case.
    async fn page(&self, limit: usize, offset: usize, filter: &str) -> Result<RecordPage, StoreError>;

    async fn get(&self, id: u64) -> Result<Record, StoreError>;

    /// Stores `record` under a fresh id, which is returned.
    async fn insert(&self, record: Record) -> Result<u64, StoreError>;

    /// Merges `fields` into record `id`.
    async fn update(&self, id: u64, fields: Record) -> Result<(), StoreError>;

    /// Deletes record `id` and returns it.
    async fn remove(&self, id: u64) -> Result<Record, StoreError>;

    /// Number of records.
    async fn count(&self) -> usize;
}

/// Reads a record's id.
#[must_use]
pub fn record_id(record: &Record) -> Option<u64> {
    record.get("id").and_then(Value::as_u64)
}

fn matches(record: &Record, needle: &str) -> bool {
    record.values().any(|value| match value {
        Value::String(s) => s.to_lowercase().contains(needle),
        Value::Number(n) => n.to_string().contains(needle),
        _ => false,
    })
}

/// A store kept in memory, optionally answering after a delay.
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    records: RwLock<Vec<Record>>,
    next_id: AtomicU64,
    latency: Duration,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            latency: Duration::ZERO,
        }
    }

    /// Delays every operation by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Loads `records`, giving an id to those without one.
    #[must_use]
    pub fn with_records(self, records: impl IntoIterator<Item = Record>) -> Self {
        {
            let mut stored = self.records.write();
            for mut record in records {
                let id = match record_id(&record) {
                    Some(id) => {
                        self.next_id.fetch_max(id + 1, Ordering::SeqCst);
                        id
                    }
                    None => self.next_id.fetch_add(1, Ordering::SeqCst),
                };
                record.insert("id".into(), Value::from(id));
                stored.push(record);
            }
        }
        self
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn not_found(&self, id: u64) -> StoreError {
        StoreError::NotFound {
            store: self.name.clone(),
            id,
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn page(&self, limit: usize, offset: usize, filter: &str) -> Result<RecordPage, StoreError> {
        trace!(store = %self.name, limit, offset, filter, "page requested");
        self.delay().await;
        let needle = filter.trim().to_lowercase();
        let records = self.records.read();
        let matching: Vec<&Record> = records
            .iter()
            .filter(|r| needle.is_empty() || matches(r, &needle))
            .collect();
        Ok(RecordPage {
            total: matching.len(),
            records: matching
                .into_iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect(),
        })
    }

    async fn get(&self, id: u64) -> Result<Record, StoreError> {
        self.delay().await;
        self.records
            .read()
            .iter()
            .find(|r| record_id(r) == Some(id))
            .cloned()
            .ok_or_else(|| self.not_found(id))
    }

    async fn insert(&self, mut record: Record) -> Result<u64, StoreError> {
        self.delay().await;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        record.insert("id".into(), Value::from(id));
        self.records.write().insert(0, record);
        debug!(store = %self.name, id, "record inserted");
        Ok(id)
    }

    async fn update(&self, id: u64, fields: Record) -> Result<(), StoreError> {
        self.delay().await;
        let mut records = self.records.write();
        let record = records
            .iter_mut()
            .find(|r| record_id(r) == Some(id))
            .ok_or_else(|| self.not_found(id))?;
        for (key, value) in fields {
            if key != "id" {
                record.insert(key, value);
            }
        }
        debug!(store = %self.name, id, "record updated");
        Ok(())
    }

    async fn remove(&self, id: u64) -> Result<Record, StoreError> {
        self.delay().await;
        let mut records = self.records.write();
        let index = records
            .iter()
            .position(|r| record_id(r) == Some(id))
            .ok_or_else(|| self.not_found(id))?;
        debug!(store = %self.name, id, "record removed");
        Ok(records.remove(index))
    }

    async fn count(&self) -> usize {
        self.records.read().len()
    }
}

/// Every store the dashboard uses, by name.
#[derive(Clone, Default)]
pub struct Backend {
    stores: BTreeMap<String, Arc<dyn RecordStore>>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("stores", &self.stores.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Backend {
    /// Creates a backend with no stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a store under its own name.
    #[must_use]
    pub fn with_store(mut self, store: impl RecordStore + 'static) -> Self {
        self.stores.insert(store.name().to_string(), Arc::new(store));
        self
    }

    /// Looks up a store.
    pub fn store(&self, name: &str) -> Result<Arc<dyn RecordStore>, StoreError> {
        self.stores
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownStore(name.to_string()))
    }

    /// Store names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.stores.keys().map(String::as_str).collect()
    }

    /// Record count of every store.
    pub async fn counts(&self) -> BTreeMap<String, usize> {
        let mut out = BTreeMap::new();
        for (name, store) in &self.stores {
            out.insert(name.clone(), store.count().await);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    fn donors() -> MemoryStore {
        MemoryStore::new("donors").with_records([
            record(json!({"first_name": "Ada", "city": "Lagos"})),
            record(json!({"first_name": "Tunde", "city": "Abuja"})),
            record(json!({"first_name": "Ngozi", "city": "Lagos"})),
        ])
    }

    #[tokio::test]
    async fn test_page_and_filter() {
        let store = donors();
        let page = store.page(2, 0, "").await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.records.len(), 2);
        assert_eq!(record_id(&page.records[0]), Some(1));

        let page = store.page(10, 0, "  LAGOS ").await.unwrap();
        assert_eq!(page.total, 2);
        let page = store.page(10, 5, "").await.unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn test_crud() {
        let store = donors();
        let id = store
            .insert(record(json!({"first_name": "Chidi", "id": 99})))
            .await
            .unwrap();
        assert_eq!(id, 4);
        assert_eq!(store.get(4).await.unwrap()["first_name"], "Chidi");

        store
            .update(4, record(json!({"city": "Enugu", "id": 1})))
            .await
            .unwrap();
        let updated = store.get(4).await.unwrap();
        assert_eq!(updated["city"], "Enugu");
        assert_eq!(updated["id"], 4);

        let removed = store.remove(2).await.unwrap();
        assert_eq!(removed["first_name"], "Tunde");
        assert_eq!(
            store.get(2).await.unwrap_err(),
            StoreError::NotFound {
                store: "donors".into(),
                id: 2
            }
        );
        assert_eq!(store.count().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency() {
        let store = donors().with_latency(Duration::from_millis(500));
        let start = tokio::time::Instant::now();
        store.page(5, 0, "").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_backend_lookup() {
        let backend = Backend::new().with_store(donors()).with_store(MemoryStore::new("users"));
        assert_eq!(backend.names(), vec!["donors", "users"]);
        assert!(backend.store("archive").is_err());
        let counts = backend.counts().await;
        assert_eq!(counts["donors"], 3);
        assert_eq!(counts["users"], 0);
    }
}
