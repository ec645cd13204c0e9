//! Remote request execution with exponential backoff
//!
//! The single point where transient network failures are absorbed. Every
//! failure is opaque and retried identically; callers observe only success
//! or the final failure, never an intermediate retry. Callers needing
//! fail-fast behavior wrap their operation with their own timeout.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use crate::types::{Result, SatchelError};

/// Retry policy for remote operations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts before rejecting (default: 3)
    pub max_attempts: u32,
    /// Base delay; attempt `n` (0-based) sleeps `base_delay * 2^n` before
    /// the next attempt (default: 1s)
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay inserted after the attempt numbered `attempt` (0-based)
    fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Execute a failable remote operation, retrying on every failure.
///
/// `label` identifies the operation in logs. The operation is attempted up
/// to `policy.max_attempts` times; each failure is logged with the attempt
/// count and error detail, and the error is returned only after the final
/// attempt. Concurrent identical requests are not deduplicated.
pub async fn execute<T, F, Fut>(label: &str, policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max = policy.max_attempts.max(1);

    for attempt in 0..max {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(
                    operation = label,
                    attempt = attempt + 1,
                    max_attempts = max,
                    error = %e,
                    "Remote operation failed"
                );

                if attempt + 1 == max {
                    error!(
                        operation = label,
                        attempts = max,
                        "Remote operation exhausted retry budget"
                    );
                    return Err(e);
                }

                tokio::time::sleep(policy.delay_after(attempt)).await;
            }
        }
    }

    // Unreachable: the loop always returns on the final attempt
    Err(SatchelError::Remote(format!("{label}: no attempts made")))
}
