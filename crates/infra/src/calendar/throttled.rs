//! Rate-limited, retrying decorator over any calendar port.
//!
//! The engine is only ever handed the decorated port, so no code path can
//! reach the destination without pacing. Every attempt (including retries)
//! goes through the limiter.

use std::sync::Arc;

use async_trait::async_trait;
use sheetsync_core::payload::EventPayload;
use sheetsync_core::ports::{CalendarPort, DestinationEvent};
use sheetsync_domain::{Result, SyncConfig};

use crate::resilience::{retry_transient, RateLimiter, RetryPolicy};

/// Composes rate limiting and bounded retry around a calendar port.
pub struct ThrottledCalendar {
    inner: Arc<dyn CalendarPort>,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl ThrottledCalendar {
    /// Wrap `inner` with explicit pacing and retry settings.
    pub fn new(inner: Arc<dyn CalendarPort>, limiter: RateLimiter, retry: RetryPolicy) -> Self {
        Self { inner, limiter, retry }
    }

    /// Wrap `inner` with settings taken from the sync configuration.
    pub fn from_config(inner: Arc<dyn CalendarPort>, config: &SyncConfig) -> Self {
        Self::new(
            inner,
            RateLimiter::new(config.min_call_interval()),
            RetryPolicy::from_config(config),
        )
    }
}

#[async_trait]
impl CalendarPort for ThrottledCalendar {
    async fn create_event(&self, payload: &EventPayload) -> Result<String> {
        retry_transient(&self.retry, || async {
            self.limiter.acquire().await;
            self.inner.create_event(payload).await
        })
        .await
    }

    async fn update_event(
        &self,
        destination_event_id: &str,
        payload: &EventPayload,
    ) -> Result<()> {
        retry_transient(&self.retry, || async {
            self.limiter.acquire().await;
            self.inner.update_event(destination_event_id, payload).await
        })
        .await
    }

    async fn delete_event(&self, destination_event_id: &str) -> Result<()> {
        retry_transient(&self.retry, || async {
            self.limiter.acquire().await;
            self.inner.delete_event(destination_event_id).await
        })
        .await
    }

    async fn get_event(&self, destination_event_id: &str) -> Result<DestinationEvent> {
        retry_transient(&self.retry, || async {
            self.limiter.acquire().await;
            self.inner.get_event(destination_event_id).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use sheetsync_domain::{CalendarFailure, SheetSyncError};

    use super::*;

    /// Fails with a transient error until `failures` attempts have burned.
    struct FlakyCalendar {
        calls: AtomicU32,
        failures: u32,
    }

    impl FlakyCalendar {
        fn new(failures: u32) -> Arc<Self> {
            Arc::new(Self { calls: AtomicU32::new(0), failures })
        }
    }

    #[async_trait]
    impl CalendarPort for FlakyCalendar {
        async fn create_event(&self, _payload: &EventPayload) -> Result<String> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                Err(SheetSyncError::calendar(CalendarFailure::RateLimited, "quota"))
            } else {
                Ok("dest-1".to_string())
            }
        }

        async fn update_event(&self, _id: &str, _payload: &EventPayload) -> Result<()> {
            Err(SheetSyncError::calendar(CalendarFailure::Api, "permanent"))
        }

        async fn delete_event(&self, _id: &str) -> Result<()> {
            Ok(())
        }

        async fn get_event(&self, id: &str) -> Result<DestinationEvent> {
            Ok(DestinationEvent { id: id.to_string(), status: "confirmed".into() })
        }
    }

    fn payload() -> EventPayload {
        let start = Utc.with_ymd_and_hms(2025, 8, 7, 10, 0, 0).unwrap();
        EventPayload {
            summary: "Planning".into(),
            description: None,
            start,
            end: start + chrono::Duration::hours(1),
            time_zone: "UTC".into(),
            color_id: None,
            focus_time: false,
        }
    }

    fn quick_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn transient_failures_are_retried_through_the_decorator() {
        let flaky = FlakyCalendar::new(2);
        let throttled = ThrottledCalendar::new(
            Arc::clone(&flaky) as Arc<dyn CalendarPort>,
            RateLimiter::new(Duration::ZERO),
            quick_retry(),
        );

        let id = throttled.create_event(&payload()).await.unwrap();
        assert_eq!(id, "dest-1");
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_the_transient_error() {
        let flaky = FlakyCalendar::new(10);
        let throttled = ThrottledCalendar::new(
            Arc::clone(&flaky) as Arc<dyn CalendarPort>,
            RateLimiter::new(Duration::ZERO),
            quick_retry(),
        );

        let err = throttled.create_event(&payload()).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_pass_straight_through() {
        let flaky = FlakyCalendar::new(0);
        let throttled = ThrottledCalendar::new(
            Arc::clone(&flaky) as Arc<dyn CalendarPort>,
            RateLimiter::new(Duration::ZERO),
            quick_retry(),
        );

        let err = throttled.update_event("dest-1", &payload()).await.unwrap_err();
        assert!(!err.is_transient());
    }
}
