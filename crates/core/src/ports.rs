//! Port interfaces consumed by the reconciliation engine.
//!
//! Infrastructure adapters implement these; the engine only ever sees the
//! traits. Calendar traffic is expected to arrive already composed with
//! rate limiting and retry (see the infra crate's throttled decorator) so
//! no caller here can bypass pacing.

use async_trait::async_trait;
use sheetsync_domain::{
    DuplicateEntry, FailedEvent, RawRow, Result, RunStats, StoreSummary, SyncRecord,
    ValidationError,
};

use crate::payload::EventPayload;

/// Destination event as returned by the existence check.
#[derive(Debug, Clone)]
pub struct DestinationEvent {
    pub id: String,
    /// Destination-side status string; "cancelled" means soft-deleted
    pub status: String,
}

impl DestinationEvent {
    /// Cancelled events count as missing for reconciliation purposes.
    pub fn is_cancelled(&self) -> bool {
        self.status.eq_ignore_ascii_case("cancelled")
    }
}

/// Calendar destination operations.
#[async_trait]
pub trait CalendarPort: Send + Sync {
    /// Create an event; returns the destination event identifier.
    async fn create_event(&self, payload: &EventPayload) -> Result<String>;

    /// Replace the content of an existing event.
    async fn update_event(&self, destination_event_id: &str, payload: &EventPayload)
        -> Result<()>;

    /// Delete an event.
    async fn delete_event(&self, destination_event_id: &str) -> Result<()>;

    /// Fetch a single event, used for existence verification.
    async fn get_event(&self, destination_event_id: &str) -> Result<DestinationEvent>;
}

/// Tabular row source.
#[async_trait]
pub trait SourcePort: Send + Sync {
    /// Fetch all data rows in sheet order.
    async fn fetch_rows(&self) -> Result<Vec<RawRow>>;
}

/// Durable mapping from unique keys to sync records, plus the append-only
/// run/failure/validation logs and the per-run duplicate report.
///
/// Store failures are fatal to the current run (decisions made against
/// stale state are worse than an aborted run), so implementations should
/// not paper over I/O errors.
#[async_trait]
pub trait SyncStateStore: Send + Sync {
    async fn get(&self, unique_key: &str) -> Result<Option<SyncRecord>>;

    /// Insert or replace the record for its unique key.
    async fn upsert(&self, record: &SyncRecord) -> Result<()>;

    /// Soft-delete: keep the record but mark it inactive.
    async fn mark_inactive(&self, unique_key: &str) -> Result<()>;

    async fn list_active(&self) -> Result<Vec<SyncRecord>>;

    async fn append_validation_errors(&self, errors: &[ValidationError]) -> Result<()>;

    async fn append_failure(&self, failure: &FailedEvent) -> Result<()>;

    /// Replace the duplicate report; duplicates are recomputed per run and
    /// never carried across runs.
    async fn record_duplicates(&self, duplicates: &[DuplicateEntry]) -> Result<()>;

    async fn append_run_stats(&self, stats: &RunStats) -> Result<()>;

    /// Most recent runs, newest first.
    async fn recent_runs(&self, limit: usize) -> Result<Vec<RunStats>>;

    /// Most recent per-candidate failures, newest first.
    async fn recent_failures(&self, limit: usize) -> Result<Vec<FailedEvent>>;

    /// Most recent validation errors, newest first.
    async fn recent_validation_errors(&self, limit: usize) -> Result<Vec<ValidationError>>;

    async fn count_failures(&self) -> Result<u64>;

    async fn count_validation_errors(&self) -> Result<u64>;

    async fn list_duplicates(&self) -> Result<Vec<DuplicateEntry>>;

    async fn summary(&self) -> Result<StoreSummary>;

    /// Clear transient logs; with `force` also drop every sync record.
    /// The destructive variant must be explicitly confirmed upstream.
    async fn reset(&self, force: bool) -> Result<()>;
}
