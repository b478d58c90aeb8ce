//! Minimum inter-call spacing for outbound requests.
//!
//! Callers reserve the next free slot under a lock and sleep outside it,
//! so concurrent acquirers line up at `min_interval` spacing instead of
//! stampeding when the lock frees up.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::trace;

/// Enforces a minimum interval between successive calls.
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// A limiter spacing calls at least `min_interval` apart.
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, next_slot: Mutex::new(None) }
    }

    /// Wait until the caller may issue its call.
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let wait = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let scheduled = match *next_slot {
                Some(slot) if slot > now => slot,
                _ => now,
            };
            *next_slot = Some(scheduled + self.min_interval);
            scheduled.saturating_duration_since(now)
        };

        if !wait.is_zero() {
            trace!(wait_ms = wait.as_millis() as u64, "pacing outbound call");
            tokio::time::sleep(wait).await;
        }
    }
}
