//! In-memory record store
//!
//! Backs tests and local demo runs. Assigns ids the way the platform does
//! (opaque strings) and supports transient-failure injection so retry
//! behavior can be exercised.

use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;
use uuid::Uuid;

use crate::store::{FieldFilter, RecordStore};
use crate::types::{FieldMap, RemoteRecord, Result, SatchelError};

/// Record store held entirely in process memory
#[derive(Default)]
pub struct MemoryRecordStore {
    collections: DashMap<String, Vec<RemoteRecord>>,
    fail_next: AtomicU32,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` operations fail with a remote error
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Insert a record directly, bypassing the trait (test setup)
    pub fn seed(&self, collection: &str, record: RemoteRecord) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(record);
    }

    /// Number of records in a collection
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|c| c.len())
            .unwrap_or(0)
    }

    /// Fetch a record by id (test inspection)
    pub fn get(&self, collection: &str, id: &str) -> Option<RemoteRecord> {
        self.collections
            .get(collection)?
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    fn check_failure(&self) -> Result<()> {
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.store(remaining - 1, Ordering::SeqCst);
            return Err(SatchelError::Remote("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryRecordStore {
    async fn query(&self, collection: &str, filter: &FieldFilter) -> Result<Vec<RemoteRecord>> {
        self.check_failure()?;

        Ok(self
            .collections
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| filter.matches(&r.fields))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(&self, collection: &str, fields: FieldMap) -> Result<RemoteRecord> {
        self.check_failure()?;

        let record = RemoteRecord::new(Uuid::new_v4().to_string(), fields);
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update(&self, collection: &str, id: &str, fields: FieldMap) -> Result<()> {
        self.check_failure()?;

        let mut records = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| SatchelError::Store(format!("Unknown collection: {collection}")))?;

        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| SatchelError::Store(format!("Record not found: {collection}/{id}")))?;

        for (field, value) in fields {
            record.fields.insert(field, value);
        }
        Ok(())
    }
}
