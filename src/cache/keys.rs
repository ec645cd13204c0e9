//! Cache key definitions
//!
//! Composite keys for the tiered cache, format `prefix:domain:user_key`.
//! The same string keys both the local tier and the shared cache service.

use std::fmt;

/// Cache key for one user's data in one domain
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Deployment-wide namespace (e.g. "satchel")
    pub prefix: String,
    /// Data domain (e.g. "deck", "planner", "board")
    pub domain: String,
    /// User-scoped key component (user id)
    pub user_key: String,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(prefix: &str, domain: &str, user_key: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            domain: domain.to_string(),
            user_key: user_key.to_string(),
        }
    }

    /// Convert to storage key string
    pub fn to_storage_key(&self) -> String {
        format!("{}:{}:{}", self.prefix, self.domain, self.user_key)
    }

    /// Prefix matching every key of a namespace, for bulk invalidation
    pub fn invalidation_prefix(prefix: &str) -> String {
        format!("{prefix}:")
    }

    /// Prefix matching every key of one domain within a namespace
    pub fn domain_prefix(prefix: &str, domain: &str) -> String {
        format!("{prefix}:{domain}:")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_storage_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_format() {
        let key = CacheKey::new("satchel", "deck", "u1");
        assert_eq!(key.to_storage_key(), "satchel:deck:u1");
    }

    #[test]
    fn test_invalidation_prefix_matches_all_domains() {
        let prefix = CacheKey::invalidation_prefix("satchel");
        let deck = CacheKey::new("satchel", "deck", "u1");
        let plan = CacheKey::new("satchel", "planner", "u1");

        assert!(deck.to_storage_key().starts_with(&prefix));
        assert!(plan.to_storage_key().starts_with(&prefix));
    }

    #[test]
    fn test_domain_prefix_excludes_other_domains() {
        let prefix = CacheKey::domain_prefix("satchel", "deck");
        let deck = CacheKey::new("satchel", "deck", "u1");
        let plan = CacheKey::new("satchel", "planner", "u1");

        assert!(deck.to_storage_key().starts_with(&prefix));
        assert!(!plan.to_storage_key().starts_with(&prefix));
    }
}
