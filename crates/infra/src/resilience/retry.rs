//! Bounded exponential backoff for transient destination failures.
//!
//! Only errors classified transient by the domain taxonomy are retried;
//! everything else surfaces immediately. On exhaustion the last error is
//! returned so the reconciler can log it as a per-candidate failure.

use std::future::Future;
use std::time::Duration;

use sheetsync_domain::{Result, SyncConfig};
use tracing::{debug, warn};

/// Retry settings for transient calendar failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempt ceiling (first try included)
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per attempt
    pub initial_backoff: Duration,
    /// Cap for any single backoff delay
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Derive the policy from the sync configuration.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            initial_backoff: config.retry_initial_backoff(),
            ..Self::default()
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

/// Run `operation`, retrying transient failures with exponential backoff.
pub async fn retry_transient<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(attempt, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt + 1 < policy.max_attempts => {
                let delay = policy.backoff_delay(attempt);
                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure; backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
