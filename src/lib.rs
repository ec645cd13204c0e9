//! Satchel - data synchronization core for hosted learning-platform pages
//!
//! Every page customization depends on this engine before it renders
//! anything: a resilient remote-fetch layer, a tiered cache in front of a
//! slow multi-tenant record store, three independent aggregators turning
//! raw persisted JSON blobs into actionable notification counts, and an
//! account-verification gate for first-time use.
//!
//! ## Components
//!
//! - **retry**: exponential-backoff execution of failable remote calls
//! - **cache**: two-level read-through cache with bulk invalidation
//! - **store**: opaque record store access (HTTP and in-memory)
//! - **profile**: idempotent find-or-create profile synchronization
//! - **notify**: pure aggregators (spaced repetition, planner, taskboard)
//! - **verification**: flag-derived onboarding gate with dual writes
//! - **pipeline**: the per-page context tying it all together

pub mod cache;
pub mod config;
pub mod notify;
pub mod pipeline;
pub mod profile;
pub mod retry;
pub mod store;
pub mod types;
pub mod verification;

pub use config::Args;
pub use pipeline::{GateStatus, SyncConfig, SyncContext, SyncOutcome};
pub use types::{RemoteRecord, Result, SatchelError, UserIdentity};
