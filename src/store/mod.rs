//! Record store access
//!
//! The backend is a slow multi-tenant record store reached through a
//! generic query/update interface. The concrete schema is opaque: callers
//! name collections and field identifiers as plain strings.
//!
//! Every call can fail and is wrapped in [`crate::retry`] by callers; the
//! store itself never retries.

mod http;
mod memory;

pub use http::HttpRecordStore;
pub use memory::MemoryRecordStore;

use serde_json::Value;

use crate::types::{FieldMap, RemoteRecord, Result};

/// Equality filter over record fields
#[derive(Debug, Clone, Default)]
pub struct FieldFilter {
    clauses: Vec<(String, Value)>,
}

impl FieldFilter {
    /// Match records whose `field` equals `value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            clauses: vec![(field.into(), value.into())],
        }
    }

    /// Add another equality clause (all clauses must match)
    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    /// Iterate the clauses
    pub fn clauses(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.clauses.iter().map(|(f, v)| (f.as_str(), v))
    }

    /// Whether a field map satisfies every clause
    pub fn matches(&self, fields: &FieldMap) -> bool {
        self.clauses
            .iter()
            .all(|(f, v)| fields.get(f).is_some_and(|actual| actual == v))
    }

    /// Canonical string form, used as the shared-cache source query
    pub fn to_query_string(&self) -> String {
        let parts: Vec<String> = self
            .clauses
            .iter()
            .map(|(f, v)| format!("{f}={v}"))
            .collect();
        parts.join("&")
    }
}

/// Trait for the remote record store (allows mocking in tests)
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Query records in a collection by equality filter
    async fn query(&self, collection: &str, filter: &FieldFilter) -> Result<Vec<RemoteRecord>>;

    /// Create a record; the store assigns the id
    async fn create(&self, collection: &str, fields: FieldMap) -> Result<RemoteRecord>;

    /// Update fields of an existing record by id
    async fn update(&self, collection: &str, id: &str, fields: FieldMap) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches() {
        let filter = FieldFilter::eq("user_id", "u1").and("kind", "deck");

        let mut fields = FieldMap::new();
        fields.insert("user_id".into(), json!("u1"));
        fields.insert("kind".into(), json!("deck"));
        fields.insert("extra".into(), json!(1));
        assert!(filter.matches(&fields));

        fields.insert("kind".into(), json!("plan"));
        assert!(!filter.matches(&fields));
    }

    #[test]
    fn test_query_string_is_deterministic() {
        let filter = FieldFilter::eq("user_id", "u1").and("kind", "deck");
        assert_eq!(filter.to_query_string(), r#"user_id="u1"&kind="deck""#);
    }
}
