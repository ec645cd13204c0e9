//! Local persistent store seam
//!
//! The page-lifetime key-value tier underneath the cache. Real deployments
//! sit on storage that can be disabled or over quota, so the interface is
//! fallible; the tiered cache swallows every error and degrades to a miss.

use dashmap::DashMap;

use crate::types::Result;

/// Trait for the local key-value tier (allows swapping backends in tests)
pub trait LocalStore: Send + Sync {
    /// Read a raw value by key
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a raw value; last write wins
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a single key
    fn remove(&self, key: &str) -> Result<()>;

    /// Remove every key starting with `prefix`; returns how many
    fn remove_by_prefix(&self, prefix: &str) -> Result<usize>;
}

/// Process-memory implementation, reset only when the context is dropped
#[derive(Default)]
pub struct MemoryLocalStore {
    entries: DashMap<String, String>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn remove_by_prefix(&self, prefix: &str) -> Result<usize> {
        let keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect();

        let mut removed = 0;
        for key in keys {
            if self.entries.remove(&key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
