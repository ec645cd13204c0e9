//! Tiered caching in front of the record store
//!
//! - `keys`: composite cache keys (`prefix:domain:user_key`)
//! - `local`: page-lifetime key-value tier
//! - `shared`: deployment-wide cache service client
//! - `tiered`: the read-through cache combining the tiers

pub mod keys;
pub mod local;
pub mod shared;
pub mod tiered;

pub use keys::CacheKey;
pub use local::{LocalStore, MemoryLocalStore};
pub use shared::{HttpSharedCache, SharedCache};
pub use tiered::{CacheStats, TieredCache};
