//! Configuration for Satchel
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::time::Duration;

use crate::pipeline::SyncConfig;
use crate::retry::RetryPolicy;

/// Satchel - data synchronization and notification engine
#[derive(Parser, Debug, Clone)]
#[command(name = "satchel")]
#[command(about = "Sync, cache and notification-aggregation core for platform pages")]
pub struct Args {
    /// Base URL of the platform record API
    #[arg(long, env = "RECORD_API_URL", default_value = "http://localhost:8090")]
    pub record_api_url: String,

    /// Endpoint of the shared cache service (optional; absent means the
    /// cache degrades to local tier + direct store fetches)
    #[arg(long, env = "SHARED_CACHE_URL")]
    pub shared_cache_url: Option<String>,

    /// Namespace prefix for cache keys
    #[arg(long, env = "CACHE_PREFIX", default_value = "satchel")]
    pub cache_prefix: String,

    /// Local cache TTL in seconds
    #[arg(long, env = "CACHE_TTL_SECONDS", default_value = "300")]
    pub cache_ttl_seconds: u64,

    /// Retry attempts per remote operation
    #[arg(long, env = "RETRY_MAX_ATTEMPTS", default_value = "3")]
    pub retry_max_attempts: u32,

    /// Base retry delay in milliseconds (doubles per attempt)
    #[arg(long, env = "RETRY_BASE_DELAY_MS", default_value = "1000")]
    pub retry_base_delay_ms: u64,

    /// HTTP request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// User id of the session to synchronize
    #[arg(long, env = "USER_ID", default_value = "")]
    pub user_id: String,

    /// Display name of the session user
    #[arg(long, env = "USER_NAME", default_value = "")]
    pub user_name: String,

    /// Email of the session user
    #[arg(long, env = "USER_EMAIL", default_value = "")]
    pub user_email: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate configuration consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.record_api_url.trim().is_empty() {
            return Err("RECORD_API_URL must not be empty".to_string());
        }
        if self.retry_max_attempts == 0 {
            return Err("RETRY_MAX_ATTEMPTS must be at least 1".to_string());
        }
        Ok(())
    }

    /// Retry policy derived from the arguments
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    /// Pipeline configuration derived from the arguments
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            cache_prefix: self.cache_prefix.clone(),
            cache_ttl: Duration::from_secs(self.cache_ttl_seconds),
            retry: self.retry_policy(),
        }
    }
}
