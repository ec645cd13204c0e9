//! Tiered read-through cache
//!
//! Two-level cache in front of the slow multi-tenant record store:
//!
//! - **Local tier**: page-lifetime TTL store; a hit younger than the
//!   caller's TTL is served immediately, an expired entry is deleted and
//!   treated as a miss.
//! - **Shared tier**: deployment-wide cache service keyed by the same
//!   composite key; a hit is written back into the local tier.
//! - **Source of truth**: on full miss the caller fetches from the record
//!   store; the result lands in the local tier only. Populating the shared
//!   tier belongs to the authoritative fetch path, not the cache.
//!
//! Invalidation clears local keys by prefix. There is no cross-tier
//! invalidation message: after a refresh the shared tier may still serve a
//! stale value until its own TTL lapses (bounded staleness, not strict
//! coherence).
//!
//! Neither tier is a hard dependency: every local-store or shared-cache
//! error is swallowed and treated as a miss.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::keys::CacheKey;
use crate::cache::local::LocalStore;
use crate::cache::shared::SharedCache;
use crate::types::Result;

/// Entry format persisted in the local tier
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    data: String,
    stored_at_ms: i64,
}

impl StoredEntry {
    fn age(&self, now_ms: i64) -> Duration {
        Duration::from_millis((now_ms - self.stored_at_ms).max(0) as u64)
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ============================================================================
// Statistics
// ============================================================================

/// Snapshot of cache counters
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Served from the local tier
    pub local_hits: u64,
    /// Served from the shared tier (and written back locally)
    pub shared_hits: u64,
    /// Neither tier had a live entry
    pub misses: u64,
    /// Local entries deleted because their TTL had lapsed
    pub expirations: u64,
}

impl CacheStats {
    /// Hit rate across both tiers, as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.local_hits + self.shared_hits + self.misses;
        if total == 0 {
            0.0
        } else {
            ((self.local_hits + self.shared_hits) as f64 / total as f64) * 100.0
        }
    }
}

// ============================================================================
// Tiered Cache
// ============================================================================

/// Two-level read-through cache with bulk invalidation
pub struct TieredCache {
    local: Arc<dyn LocalStore>,
    shared: Option<Arc<dyn SharedCache>>,

    local_hits: AtomicU64,
    shared_hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
}

impl TieredCache {
    /// Create a cache over a local tier and an optional shared tier
    pub fn new(local: Arc<dyn LocalStore>, shared: Option<Arc<dyn SharedCache>>) -> Self {
        Self {
            local,
            shared,
            local_hits: AtomicU64::new(0),
            shared_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    /// Read through both tiers. A local hit younger than `ttl` wins; an
    /// expired local entry is deleted and treated as a miss; a shared hit
    /// is written back into the local tier before being returned.
    pub async fn get(
        &self,
        key: &CacheKey,
        ttl: Duration,
        source_query: &str,
    ) -> Option<String> {
        let storage_key = key.to_storage_key();

        if let Some(data) = self.get_local(&storage_key, ttl) {
            self.local_hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %storage_key, "Local cache hit");
            return Some(data);
        }

        if let Some(shared) = &self.shared {
            match shared.lookup(&storage_key, source_query).await {
                Ok(Some(data)) => {
                    self.shared_hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %storage_key, "Shared cache hit");
                    self.set(key, &data);
                    return Some(data);
                }
                Ok(None) => {}
                Err(e) => {
                    // Best-effort tier: degrade to a miss
                    warn!(key = %storage_key, error = %e, "Shared cache unavailable");
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %storage_key, "Cache miss");
        None
    }

    /// Read through both tiers and deserialize the payload
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        source_query: &str,
    ) -> Option<T> {
        let data = self.get(key, ttl, source_query).await?;
        match serde_json::from_str(&data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Cached payload failed to deserialize");
                None
            }
        }
    }

    /// Write a payload into the local tier. Last write wins; a redundant
    /// overwrite after a suspended read is expected and harmless.
    pub fn set(&self, key: &CacheKey, data: &str) {
        let entry = StoredEntry {
            data: data.to_string(),
            stored_at_ms: now_ms(),
        };
        let serialized = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache entry failed to serialize");
                return;
            }
        };

        if let Err(e) = self.local.set(&key.to_storage_key(), &serialized) {
            // Quota exceeded or storage disabled; the cache stays best-effort
            warn!(key = %key, error = %e, "Local cache write failed");
        }
    }

    /// Remove every local entry whose key starts with `prefix`. Returns
    /// how many entries were removed. The shared tier is untouched.
    pub fn invalidate_by_prefix(&self, prefix: &str) -> usize {
        match self.local.remove_by_prefix(prefix) {
            Ok(removed) => {
                debug!(prefix = prefix, removed = removed, "Cache invalidated");
                removed
            }
            Err(e) => {
                warn!(prefix = prefix, error = %e, "Cache invalidation failed");
                0
            }
        }
    }

    /// Read through both tiers, falling back to the caller's authoritative
    /// fetch on a full miss. The fetched payload is written into the local
    /// tier before being returned.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        source_query: &str,
        fetch: F,
    ) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<String>>,
    {
        if let Some(data) = self.get(key, ttl, source_query).await {
            return Ok(data);
        }

        let data = fetch().await?;
        self.set(key, &data);
        Ok(data)
    }

    /// Snapshot of the hit/miss counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            local_hits: self.local_hits.load(Ordering::Relaxed),
            shared_hits: self.shared_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    fn get_local(&self, storage_key: &str, ttl: Duration) -> Option<String> {
        let raw = match self.local.get(storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = storage_key, error = %e, "Local cache read failed");
                return None;
            }
        };

        let entry: StoredEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                // Corrupt entry: drop it and treat as a miss
                warn!(key = storage_key, error = %e, "Dropping corrupt cache entry");
                let _ = self.local.remove(storage_key);
                return None;
            }
        };

        if entry.age(now_ms()) < ttl {
            return Some(entry.data);
        }

        self.expirations.fetch_add(1, Ordering::Relaxed);
        debug!(key = storage_key, "Local cache entry expired");
        let _ = self.local.remove(storage_key);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::local::MemoryLocalStore;
    use crate::types::SatchelError;
    use std::sync::atomic::AtomicU32;

    fn key(domain: &str) -> CacheKey {
        CacheKey::new("satchel", domain, "u1")
    }

    fn cache_without_shared() -> (Arc<MemoryLocalStore>, TieredCache) {
        let local = Arc::new(MemoryLocalStore::new());
        let cache = TieredCache::new(local.clone(), None);
        (local, cache)
    }

    /// Shared-tier stub holding a fixed payload
    struct FixedShared {
        data: Option<String>,
        lookups: AtomicU32,
    }

    impl FixedShared {
        fn with(data: &str) -> Arc<Self> {
            Arc::new(Self {
                data: Some(data.to_string()),
                lookups: AtomicU32::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl SharedCache for FixedShared {
        async fn lookup(&self, _key: &str, _query: &str) -> Result<Option<String>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.data.clone())
        }
    }

    /// Shared-tier stub that always errors
    struct BrokenShared;

    #[async_trait::async_trait]
    impl SharedCache for BrokenShared {
        async fn lookup(&self, _key: &str, _query: &str) -> Result<Option<String>> {
            Err(SatchelError::Remote("shared cache down".into()))
        }
    }

    #[tokio::test]
    async fn test_set_then_get_within_ttl() {
        let (_, cache) = cache_without_shared();
        let k = key("deck");

        cache.set(&k, "payload");
        let got = cache.get(&k, Duration::from_secs(60), "").await;
        assert_eq!(got.as_deref(), Some("payload"));
        assert_eq!(cache.stats().local_hits, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_deleted_and_missed() {
        let (local, cache) = cache_without_shared();
        let k = key("deck");

        // Entry stored an hour ago
        let entry = StoredEntry {
            data: "old".into(),
            stored_at_ms: now_ms() - 3_600_000,
        };
        local
            .set(&k.to_storage_key(), &serde_json::to_string(&entry).unwrap())
            .unwrap();

        let got = cache.get(&k, Duration::from_secs(60), "").await;
        assert_eq!(got, None);
        assert_eq!(cache.stats().expirations, 1);
        assert_eq!(cache.stats().misses, 1);

        // The expired entry was removed, not merely skipped
        assert_eq!(local.get(&k.to_storage_key()).unwrap(), None);
    }

    #[tokio::test]
    async fn test_entry_still_served_just_under_ttl() {
        let (local, cache) = cache_without_shared();
        let k = key("deck");

        let entry = StoredEntry {
            data: "fresh".into(),
            stored_at_ms: now_ms() - 59_000,
        };
        local
            .set(&k.to_storage_key(), &serde_json::to_string(&entry).unwrap())
            .unwrap();

        let got = cache.get(&k, Duration::from_secs(60), "").await;
        assert_eq!(got.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_shared_hit_written_back_locally() {
        let local = Arc::new(MemoryLocalStore::new());
        let shared = FixedShared::with("shared-payload");
        let cache = TieredCache::new(local.clone(), Some(shared.clone()));
        let k = key("deck");

        let got = cache.get(&k, Duration::from_secs(60), "q").await;
        assert_eq!(got.as_deref(), Some("shared-payload"));
        assert_eq!(cache.stats().shared_hits, 1);

        // Second read is a local hit; the shared tier is not consulted again
        let got = cache.get(&k, Duration::from_secs(60), "q").await;
        assert_eq!(got.as_deref(), Some("shared-payload"));
        assert_eq!(cache.stats().local_hits, 1);
        assert_eq!(shared.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shared_error_degrades_to_miss() {
        let local = Arc::new(MemoryLocalStore::new());
        let cache = TieredCache::new(local, Some(Arc::new(BrokenShared)));
        let k = key("deck");

        let got = cache.get(&k, Duration::from_secs(60), "q").await;
        assert_eq!(got, None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_invalidate_by_prefix_leaves_shared_tier() {
        let local = Arc::new(MemoryLocalStore::new());
        let shared = FixedShared::with("stale-but-shared");
        let cache = TieredCache::new(local, Some(shared));

        let deck = key("deck");
        let plan = key("planner");
        cache.set(&deck, "d");
        cache.set(&plan, "p");

        let removed = cache.invalidate_by_prefix(&CacheKey::invalidation_prefix("satchel"));
        assert_eq!(removed, 2);

        // Bounded staleness: the next read can still observe the shared
        // tier's value until that tier's own TTL lapses
        let got = cache.get(&deck, Duration::from_secs(60), "q").await;
        assert_eq!(got.as_deref(), Some("stale-but-shared"));
    }

    #[tokio::test]
    async fn test_get_or_fetch_populates_local_only() {
        let (local, cache) = cache_without_shared();
        let k = key("board");

        let data = cache
            .get_or_fetch(&k, Duration::from_secs(60), "q", || async {
                Ok("from-source".to_string())
            })
            .await
            .unwrap();
        assert_eq!(data, "from-source");
        assert_eq!(local.len(), 1);

        // Second call is served from the local tier, not the fetch
        let data = cache
            .get_or_fetch(&k, Duration::from_secs(60), "q", || async {
                panic!("fetch must not run on a hit")
            })
            .await
            .unwrap();
        assert_eq!(data, "from-source");
    }

    #[tokio::test]
    async fn test_get_or_fetch_propagates_source_failure() {
        let (_, cache) = cache_without_shared();
        let k = key("board");

        let result = cache
            .get_or_fetch(&k, Duration::from_secs(60), "q", || async {
                Err(SatchelError::Remote("source down".into()))
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_local_entry_dropped() {
        let (local, cache) = cache_without_shared();
        let k = key("deck");
        local.set(&k.to_storage_key(), "not json").unwrap();

        let got = cache.get(&k, Duration::from_secs(60), "").await;
        assert_eq!(got, None);
        assert_eq!(local.get(&k.to_storage_key()).unwrap(), None);
    }
}
