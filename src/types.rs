//! Core types shared across the engine
//!
//! The backend is an opaque multi-tenant record store: every record is a
//! platform-assigned id plus a field-identifier -> value mapping. Nothing
//! here knows the backend schema.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, SatchelError>;

/// Opaque field mapping as stored by the platform
pub type FieldMap = Map<String, Value>;

// ============================================================================
// Errors
// ============================================================================

/// Error type for engine operations
#[derive(Debug, Error)]
pub enum SatchelError {
    /// Remote call failed (network error, non-2xx, timeout). Opaque by
    /// design: the retry layer treats every remote failure identically.
    #[error("Remote operation failed: {0}")]
    Remote(String),

    /// Record store rejected or could not complete a query/create/update
    #[error("Record store error: {0}")]
    Store(String),

    /// Payload could not be serialized or deserialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A synchronization run is already in flight for this context
    #[error("Synchronization already running")]
    AlreadyRunning,
}

// ============================================================================
// Records
// ============================================================================

/// A record owned by the remote store
///
/// Mutated only through explicit update calls; never cached indefinitely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Platform-assigned identifier
    pub id: String,
    /// Opaque field-identifier -> value mapping
    pub fields: FieldMap,
}

impl RemoteRecord {
    /// Create a record from an id and fields
    pub fn new(id: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Read a field as a string slice, if present and a string
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Read a field as an i64, tolerating numeric strings
    pub fn int_field(&self, name: &str) -> Option<i64> {
        match self.fields.get(name) {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Read a field as a bool, tolerating "true"/"false" strings
    pub fn bool_field(&self, name: &str) -> bool {
        match self.fields.get(name) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

// ============================================================================
// Identity
// ============================================================================

/// The logged-in user as observed by the page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Platform user id; required for everything
    pub user_id: String,
    /// Display name
    pub user_name: String,
    /// Email, used to locate the directory record
    pub user_email: String,
}

impl UserIdentity {
    pub fn new(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        user_email: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            user_email: user_email.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_with(fields: Value) -> RemoteRecord {
        RemoteRecord::new("rec1", fields.as_object().unwrap().clone())
    }

    #[test]
    fn test_str_field() {
        let rec = record_with(json!({"name": "Ada", "count": 3}));
        assert_eq!(rec.str_field("name"), Some("Ada"));
        assert_eq!(rec.str_field("count"), None);
        assert_eq!(rec.str_field("missing"), None);
    }

    #[test]
    fn test_int_field_tolerates_strings() {
        let rec = record_with(json!({"count": 3, "logins": "41", "bad": "x"}));
        assert_eq!(rec.int_field("count"), Some(3));
        assert_eq!(rec.int_field("logins"), Some(41));
        assert_eq!(rec.int_field("bad"), None);
    }

    #[test]
    fn test_bool_field_tolerates_strings() {
        let rec = record_with(json!({"a": true, "b": "TRUE", "c": "no", "d": 1}));
        assert!(rec.bool_field("a"));
        assert!(rec.bool_field("b"));
        assert!(!rec.bool_field("c"));
        assert!(!rec.bool_field("d"));
        assert!(!rec.bool_field("missing"));
    }
}
