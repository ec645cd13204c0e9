//! Satchel binary: run one synchronization pass against the configured
//! platform endpoints and log the outcome.

use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use satchel::cache::{HttpSharedCache, MemoryLocalStore, SharedCache};
use satchel::config::Args;
use satchel::pipeline::{GateStatus, SyncContext};
use satchel::store::HttpRecordStore;
use satchel::types::UserIdentity;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("satchel={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Satchel - page synchronization core");
    info!("======================================");
    info!("Record API: {}", args.record_api_url);
    info!(
        "Shared cache: {}",
        args.shared_cache_url.as_deref().unwrap_or("disabled")
    );
    info!("Cache TTL: {}s", args.cache_ttl_seconds);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_millis(args.request_timeout_ms))
        .build()?;

    let store = Arc::new(HttpRecordStore::new(&args.record_api_url, client.clone()));
    let shared: Option<Arc<dyn SharedCache>> = args
        .shared_cache_url
        .as_ref()
        .map(|url| Arc::new(HttpSharedCache::new(url, client)) as Arc<dyn SharedCache>);

    let context = SyncContext::new(
        store,
        Arc::new(MemoryLocalStore::new()),
        shared,
        args.sync_config(),
    );

    let identity = UserIdentity::new(&args.user_id, &args.user_name, &args.user_email);
    match context.run(&identity).await {
        Ok(outcome) => match outcome.gate {
            GateStatus::StepsRequired(steps) => {
                info!(steps = ?steps, "Verification pending; synchronization deferred");
            }
            GateStatus::Cleared => {
                info!(
                    profile = outcome.profile.as_ref().map(|p| p.id.as_str()).unwrap_or("-"),
                    due_cards = outcome.deck.total_due,
                    sessions = outcome.planner.count,
                    doing_tasks = outcome.board.doing_count,
                    "Synchronization complete"
                );
            }
        },
        Err(e) => {
            // The single user-visible failure: the profile could not load
            error!(error = %e, "Unable to load profile");
            std::process::exit(1);
        }
    }

    let stats = context.cache().stats();
    info!(
        local_hits = stats.local_hits,
        shared_hits = stats.shared_hits,
        misses = stats.misses,
        "Cache statistics"
    );

    Ok(())
}
