//! Synchronization pipeline
//!
//! The explicit per-page context that replaces hidden module state:
//! created on page enter, discarded on page leave. One `run` performs the
//! whole synchronization pass:
//!
//! 1. verification gate (steps required -> summaries stay empty, further
//!    initialization is deferred)
//! 2. profile resolution (find-or-create + per-login refresh)
//! 3. the three data domains, fetched concurrently through the tiered
//!    cache and folded by their aggregators
//!
//! Repeated page-lifecycle events are absorbed by an in-flight latch: a
//! second `run` while one is active observes `AlreadyRunning` instead of
//! re-entering the synchronization. The global refresh hook clears the
//! local cache tier by prefix and re-runs the pipeline; the shared tier
//! may keep serving its value until that tier's own TTL lapses.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, LocalStore, SharedCache, TieredCache};
use crate::notify::{
    summarize_board, summarize_deck, summarize_week, BoardSummary, DeckSummary, PlannerSummary,
};
use crate::profile::ProfileSynchronizer;
use crate::retry::{self, RetryPolicy};
use crate::store::{FieldFilter, RecordStore};
use crate::types::{FieldMap, RemoteRecord, Result, SatchelError, UserIdentity};
use crate::verification::{VerificationFlow, VerificationStep, ACCOUNTS};

/// Cache domains and the collections feeding them
pub mod domains {
    pub const DECK: &str = "deck";
    pub const PLANNER: &str = "planner";
    pub const BOARD: &str = "board";

    pub const DECKS_COLLECTION: &str = "decks";
    pub const PLANS_COLLECTION: &str = "plans";
    pub const BOARDS_COLLECTION: &str = "boards";

    /// Field holding the serialized weekly plan on a plan record
    pub const PLAN_FIELD: &str = "plan";
    /// Field holding the serialized task list on a board record
    pub const BOARD_FIELD: &str = "board";
}

// ============================================================================
// Configuration & Outcome
// ============================================================================

/// Tuning knobs for one pipeline context
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Namespace prefix for every cache key
    pub cache_prefix: String,
    /// TTL applied to domain payloads in the local tier
    pub cache_ttl: Duration,
    /// Retry policy for every remote call
    pub retry: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cache_prefix: "satchel".to_string(),
            cache_ttl: Duration::from_secs(300),
            retry: RetryPolicy::default(),
        }
    }
}

/// Verification gate result handed to the renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateStatus {
    /// No steps outstanding; the pipeline ran to completion
    Cleared,
    /// Onboarding steps must complete first; initialization was deferred
    StepsRequired(Vec<VerificationStep>),
}

/// Everything the renderer needs from one synchronization pass
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub gate: GateStatus,
    pub profile: Option<RemoteRecord>,
    pub deck: DeckSummary,
    pub planner: PlannerSummary,
    pub board: BoardSummary,
}

impl SyncOutcome {
    fn deferred(steps: Vec<VerificationStep>) -> Self {
        Self {
            gate: GateStatus::StepsRequired(steps),
            profile: None,
            deck: DeckSummary::default(),
            planner: PlannerSummary::default(),
            board: BoardSummary::default(),
        }
    }
}

// ============================================================================
// Context
// ============================================================================

/// Per-page synchronization context
pub struct SyncContext {
    store: Arc<dyn RecordStore>,
    cache: TieredCache,
    profiles: ProfileSynchronizer,
    config: SyncConfig,
    running: AtomicBool,
}

impl SyncContext {
    pub fn new(
        store: Arc<dyn RecordStore>,
        local: Arc<dyn LocalStore>,
        shared: Option<Arc<dyn SharedCache>>,
        config: SyncConfig,
    ) -> Self {
        let cache = TieredCache::new(local, shared);
        let profiles = ProfileSynchronizer::new(store.clone(), config.retry.clone());
        Self {
            store,
            cache,
            profiles,
            config,
            running: AtomicBool::new(false),
        }
    }

    /// The tiered cache serving this context
    pub fn cache(&self) -> &TieredCache {
        &self.cache
    }

    /// Run one synchronization pass.
    ///
    /// Returns `AlreadyRunning` when another pass is in flight. A profile
    /// resolution failure surfaces as the error behind the final "unable
    /// to load profile" message; every other failure degrades to an empty
    /// value inside the outcome.
    pub async fn run(&self, identity: &UserIdentity) -> Result<SyncOutcome> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Synchronization already in flight, ignoring duplicate run");
            return Err(SatchelError::AlreadyRunning);
        }
        let _latch = LatchGuard(&self.running);

        // Gate first: initialization before the verification signal must
        // be deferred.
        if let Some(flow) = self.verification_flow(identity).await {
            if !flow.is_cleared() {
                info!(
                    steps = flow.remaining_steps().len(),
                    "Verification pending, deferring synchronization"
                );
                return Ok(SyncOutcome::deferred(flow.remaining_steps().to_vec()));
            }
        }

        let profile = self.profiles.resolve_profile(identity).await?;
        if profile.is_none() {
            return Ok(SyncOutcome {
                gate: GateStatus::Cleared,
                profile: None,
                deck: DeckSummary::default(),
                planner: PlannerSummary::default(),
                board: BoardSummary::default(),
            });
        }

        let today = Utc::now().date_naive();
        let user_id = identity.user_id.as_str();

        // Independent domains fetch concurrently; each domain's own retry
        // sequence stays strictly sequential inside its fetch.
        let (deck, planner, board) = futures::join!(
            self.deck_summary(user_id, today),
            self.planner_summary(user_id, today),
            self.board_summary(user_id),
        );

        info!(
            due = deck.total_due,
            sessions = planner.count,
            doing = board.doing_count,
            "Synchronization pass complete"
        );

        Ok(SyncOutcome {
            gate: GateStatus::Cleared,
            profile,
            deck,
            planner,
            board,
        })
    }

    /// Global refresh hook: clear the local cache tier and re-run.
    ///
    /// The shared tier is deliberately untouched; a refresh may still
    /// observe its value until that tier's own TTL lapses.
    pub async fn refresh_all(&self, identity: &UserIdentity) -> Result<SyncOutcome> {
        let prefix = CacheKey::invalidation_prefix(&self.config.cache_prefix);
        let removed = self.cache.invalidate_by_prefix(&prefix);
        info!(removed = removed, "Forced refresh, local cache cleared");
        self.run(identity).await
    }

    /// Build the verification flow for this user's account, when one
    /// exists. A missing or unreachable account record never blocks: the
    /// gate degrades to cleared with a warning.
    pub async fn verification_flow(&self, identity: &UserIdentity) -> Option<VerificationFlow> {
        if identity.user_id.trim().is_empty() {
            return None;
        }

        let store = self.store.clone();
        let filter = FieldFilter::eq("user_id", identity.user_id.as_str());
        let result = retry::execute("account-query", &self.config.retry, || {
            let store = store.clone();
            let filter = filter.clone();
            async move { store.query(ACCOUNTS, &filter).await }
        })
        .await;

        let account = match result {
            Ok(records) => records.into_iter().next()?,
            Err(e) => {
                warn!(error = %e, "Account lookup failed, verification gate degraded");
                return None;
            }
        };

        let directory_id = self.find_directory_id(&identity.user_email).await;
        Some(VerificationFlow::new(
            self.store.clone(),
            self.config.retry.clone(),
            &account,
            directory_id,
        ))
    }

    async fn find_directory_id(&self, email: &str) -> Option<String> {
        if email.trim().is_empty() {
            return None;
        }

        let store = self.store.clone();
        let filter = FieldFilter::eq("email", email);
        let result = retry::execute("directory-query", &self.config.retry, || {
            let store = store.clone();
            let filter = filter.clone();
            async move {
                store
                    .query(crate::verification::DIRECTORY, &filter)
                    .await
            }
        })
        .await;

        match result {
            Ok(records) => records.into_iter().next().map(|r| r.id),
            Err(e) => {
                warn!(error = %e, "Directory lookup for dual write failed");
                None
            }
        }
    }

    // ========================================================================
    // Domain fetches
    // ========================================================================

    async fn deck_summary(&self, user_id: &str, today: chrono::NaiveDate) -> DeckSummary {
        match self
            .domain_fields(domains::DECK, domains::DECKS_COLLECTION, user_id)
            .await
        {
            Some(fields) => summarize_deck(&fields, today),
            None => DeckSummary::default(),
        }
    }

    async fn planner_summary(&self, user_id: &str, today: chrono::NaiveDate) -> PlannerSummary {
        let Some(fields) = self
            .domain_fields(domains::PLANNER, domains::PLANS_COLLECTION, user_id)
            .await
        else {
            return PlannerSummary::default();
        };

        match fields.get(domains::PLAN_FIELD).and_then(Value::as_str) {
            Some(raw) => summarize_week(raw, today),
            None => PlannerSummary::default(),
        }
    }

    async fn board_summary(&self, user_id: &str) -> BoardSummary {
        let Some(fields) = self
            .domain_fields(domains::BOARD, domains::BOARDS_COLLECTION, user_id)
            .await
        else {
            return BoardSummary::default();
        };

        match fields.get(domains::BOARD_FIELD).and_then(Value::as_str) {
            Some(raw) => summarize_board(raw),
            None => BoardSummary::default(),
        }
    }

    /// Fetch one domain record's fields through the tiered cache.
    ///
    /// The authoritative fetch serializes the first matching record's
    /// fields (or an empty object) into the cache payload. A failed fetch
    /// degrades to `None`, which every aggregator folds to its zero
    /// summary.
    async fn domain_fields(
        &self,
        domain: &str,
        collection: &str,
        user_id: &str,
    ) -> Option<FieldMap> {
        let key = CacheKey::new(&self.config.cache_prefix, domain, user_id);
        let filter = FieldFilter::eq("user_id", user_id);
        let source_query = format!("{collection}?{}", filter.to_query_string());

        let store = self.store.clone();
        let retry_policy = self.config.retry.clone();
        let collection_name = collection.to_string();

        let fetched = self
            .cache
            .get_or_fetch(&key, self.config.cache_ttl, &source_query, || async move {
                let records = retry::execute(&collection_name, &retry_policy, || {
                    let store = store.clone();
                    let filter = filter.clone();
                    let collection_name = collection_name.clone();
                    async move { store.query(&collection_name, &filter).await }
                })
                .await?;

                let fields = records
                    .into_iter()
                    .next()
                    .map(|r| r.fields)
                    .unwrap_or_default();
                Ok(serde_json::to_string(&fields)?)
            })
            .await;

        match fetched {
            Ok(payload) => match serde_json::from_str::<FieldMap>(&payload) {
                Ok(fields) => Some(fields),
                Err(e) => {
                    warn!(domain = domain, error = %e, "Cached domain payload unreadable");
                    None
                }
            },
            Err(e) => {
                warn!(domain = domain, error = %e, "Domain fetch failed, empty summary");
                None
            }
        }
    }
}

/// Resets the in-flight latch when a run finishes, success or not
struct LatchGuard<'a>(&'a AtomicBool);

impl Drop for LatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
