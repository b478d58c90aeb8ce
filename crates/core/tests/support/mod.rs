//! Shared test doubles for engine integration tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sheetsync_core::payload::EventPayload;
use sheetsync_core::ports::{CalendarPort, DestinationEvent, SourcePort, SyncStateStore};
use sheetsync_core::sync::SyncEngineConfig;
use sheetsync_domain::constants::{
    COL_CATEGORY, COL_COLOR, COL_DESCRIPTION, COL_END, COL_EVENT_ID, COL_EVENT_NAME, COL_START,
};
use sheetsync_domain::{
    CalendarFailure, DuplicateEntry, FailedEvent, RawRow, Result, RunStats, SheetSyncError,
    StoreSummary, SyncRecord, ValidationError,
};
use tokio::sync::{Mutex as TokioMutex, Notify};

/// Engine config anchored to UTC so sheet times read literally.
pub fn engine_config(verify_existence: bool) -> SyncEngineConfig {
    SyncEngineConfig {
        time_zone: chrono_tz::UTC,
        verify_existence,
        run_timeout: std::time::Duration::from_secs(60),
    }
}

/// Build a sheet row with the canonical columns.
pub fn sheet_row(row_number: usize, id: &str, name: &str, start: &str, end: &str) -> RawRow {
    let mut columns = BTreeMap::new();
    columns.insert(COL_EVENT_ID.to_string(), id.to_string());
    columns.insert(COL_EVENT_NAME.to_string(), name.to_string());
    columns.insert(COL_DESCRIPTION.to_string(), String::new());
    columns.insert(COL_START.to_string(), start.to_string());
    columns.insert(COL_END.to_string(), end.to_string());
    columns.insert(COL_COLOR.to_string(), String::new());
    columns.insert(COL_CATEGORY.to_string(), "DEFAULT".to_string());
    RawRow { row_number, columns }
}

/// A persisted record starting at `now + start_offset`, for range tests.
pub fn record_at(unique_key: &str, start_offset: Duration) -> SyncRecord {
    let start = Utc::now() + start_offset;
    SyncRecord {
        unique_key: unique_key.to_string(),
        external_id: unique_key.to_string(),
        destination_event_id: format!("dest-{unique_key}"),
        content_hash: "hash".to_string(),
        event_name: format!("{unique_key} event"),
        start,
        end: start + Duration::hours(1),
        last_synced_at: Utc::now(),
        active: true,
    }
}

/// Fixed source returning the configured rows.
pub struct StaticSource {
    rows: Vec<RawRow>,
}

impl StaticSource {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl SourcePort for StaticSource {
    async fn fetch_rows(&self) -> Result<Vec<RawRow>> {
        Ok(self.rows.clone())
    }
}

/// In-memory calendar double that tracks every call and the events it
/// currently "holds".
#[derive(Default)]
pub struct MockCalendar {
    next_id: AtomicUsize,
    events: TokioMutex<HashMap<String, DestinationEvent>>,
    created: TokioMutex<Vec<EventPayload>>,
    updated: TokioMutex<Vec<(String, EventPayload)>>,
    deleted: TokioMutex<Vec<String>>,
    /// Summaries whose create call should fail with a permanent API error
    fail_create_for: TokioMutex<Vec<String>>,
    /// When set, create_event blocks until notified (for overlap tests)
    gate: TokioMutex<Option<Arc<Notify>>>,
}

impl MockCalendar {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn fail_create_for(&self, summary: &str) {
        self.fail_create_for.lock().await.push(summary.to_string());
    }

    pub async fn hold_creates(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().await = Some(Arc::clone(&notify));
        notify
    }

    /// Simulate an out-of-band deletion in the destination.
    pub async fn remove_event(&self, destination_event_id: &str) {
        self.events.lock().await.remove(destination_event_id);
    }

    /// Pretend an event already exists in the destination.
    pub async fn seed_event(&self, destination_event_id: &str) {
        self.events.lock().await.insert(
            destination_event_id.to_string(),
            DestinationEvent { id: destination_event_id.to_string(), status: "confirmed".into() },
        );
    }

    pub async fn created_count(&self) -> usize {
        self.created.lock().await.len()
    }

    pub async fn updated_calls(&self) -> Vec<(String, EventPayload)> {
        self.updated.lock().await.clone()
    }

    pub async fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().await.clone()
    }

    pub async fn holds_event(&self, destination_event_id: &str) -> bool {
        self.events.lock().await.contains_key(destination_event_id)
    }
}

#[async_trait]
impl CalendarPort for MockCalendar {
    async fn create_event(&self, payload: &EventPayload) -> Result<String> {
        let gate = self.gate.lock().await.clone();
        if let Some(notify) = gate {
            notify.notified().await;
        }

        if self.fail_create_for.lock().await.contains(&payload.summary) {
            return Err(SheetSyncError::calendar(CalendarFailure::Api, "insert rejected"));
        }

        let id = format!("dest-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.events
            .lock()
            .await
            .insert(id.clone(), DestinationEvent { id: id.clone(), status: "confirmed".into() });
        self.created.lock().await.push(payload.clone());
        Ok(id)
    }

    async fn update_event(
        &self,
        destination_event_id: &str,
        payload: &EventPayload,
    ) -> Result<()> {
        if !self.events.lock().await.contains_key(destination_event_id) {
            return Err(SheetSyncError::calendar(CalendarFailure::NotFound, "no such event"));
        }
        self.updated.lock().await.push((destination_event_id.to_string(), payload.clone()));
        Ok(())
    }

    async fn delete_event(&self, destination_event_id: &str) -> Result<()> {
        if self.events.lock().await.remove(destination_event_id).is_none() {
            return Err(SheetSyncError::calendar(CalendarFailure::NotFound, "no such event"));
        }
        self.deleted.lock().await.push(destination_event_id.to_string());
        Ok(())
    }

    async fn get_event(&self, destination_event_id: &str) -> Result<DestinationEvent> {
        self.events
            .lock()
            .await
            .get(destination_event_id)
            .cloned()
            .ok_or_else(|| SheetSyncError::calendar(CalendarFailure::NotFound, "no such event"))
    }
}

#[derive(Default)]
struct StoreState {
    records: BTreeMap<String, SyncRecord>,
    validation_errors: Vec<ValidationError>,
    failures: Vec<FailedEvent>,
    duplicates: Vec<DuplicateEntry>,
    runs: Vec<RunStats>,
}

/// In-memory store double; `fail_upserts` flips every upsert into a store
/// error to exercise the fatal path.
#[derive(Default)]
pub struct InMemoryStore {
    state: TokioMutex<StoreState>,
    fail_upserts: TokioMutex<bool>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn set_fail_upserts(&self, fail: bool) {
        *self.fail_upserts.lock().await = fail;
    }

    pub async fn seed_record(&self, record: SyncRecord) {
        self.state.lock().await.records.insert(record.unique_key.clone(), record);
    }

    pub async fn record(&self, unique_key: &str) -> Option<SyncRecord> {
        self.state.lock().await.records.get(unique_key).cloned()
    }

    pub async fn records(&self) -> Vec<SyncRecord> {
        self.state.lock().await.records.values().cloned().collect()
    }

    pub async fn failures(&self) -> Vec<FailedEvent> {
        self.state.lock().await.failures.clone()
    }

    pub async fn runs(&self) -> Vec<RunStats> {
        self.state.lock().await.runs.clone()
    }
}

#[async_trait]
impl SyncStateStore for InMemoryStore {
    async fn get(&self, unique_key: &str) -> Result<Option<SyncRecord>> {
        Ok(self.state.lock().await.records.get(unique_key).cloned())
    }

    async fn upsert(&self, record: &SyncRecord) -> Result<()> {
        if *self.fail_upserts.lock().await {
            return Err(SheetSyncError::Store("upsert failed".into()));
        }
        self.state.lock().await.records.insert(record.unique_key.clone(), record.clone());
        Ok(())
    }

    async fn mark_inactive(&self, unique_key: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        match state.records.get_mut(unique_key) {
            Some(record) => {
                record.active = false;
                Ok(())
            }
            None => Err(SheetSyncError::NotFound(format!("no record for {unique_key}"))),
        }
    }

    async fn list_active(&self) -> Result<Vec<SyncRecord>> {
        Ok(self
            .state
            .lock()
            .await
            .records
            .values()
            .filter(|r| r.active)
            .cloned()
            .collect())
    }

    async fn append_validation_errors(&self, errors: &[ValidationError]) -> Result<()> {
        self.state.lock().await.validation_errors.extend_from_slice(errors);
        Ok(())
    }

    async fn append_failure(&self, failure: &FailedEvent) -> Result<()> {
        self.state.lock().await.failures.push(failure.clone());
        Ok(())
    }

    async fn record_duplicates(&self, duplicates: &[DuplicateEntry]) -> Result<()> {
        let mut state = self.state.lock().await;
        state.duplicates = duplicates.to_vec();
        Ok(())
    }

    async fn append_run_stats(&self, stats: &RunStats) -> Result<()> {
        self.state.lock().await.runs.push(stats.clone());
        Ok(())
    }

    async fn recent_runs(&self, limit: usize) -> Result<Vec<RunStats>> {
        let state = self.state.lock().await;
        Ok(state.runs.iter().rev().take(limit).cloned().collect())
    }

    async fn recent_failures(&self, limit: usize) -> Result<Vec<FailedEvent>> {
        let state = self.state.lock().await;
        Ok(state.failures.iter().rev().take(limit).cloned().collect())
    }

    async fn recent_validation_errors(&self, limit: usize) -> Result<Vec<ValidationError>> {
        let state = self.state.lock().await;
        Ok(state.validation_errors.iter().rev().take(limit).cloned().collect())
    }

    async fn count_failures(&self) -> Result<u64> {
        Ok(self.state.lock().await.failures.len() as u64)
    }

    async fn count_validation_errors(&self) -> Result<u64> {
        Ok(self.state.lock().await.validation_errors.len() as u64)
    }

    async fn list_duplicates(&self) -> Result<Vec<DuplicateEntry>> {
        Ok(self.state.lock().await.duplicates.clone())
    }

    async fn summary(&self) -> Result<StoreSummary> {
        let state = self.state.lock().await;
        let unique: std::collections::HashSet<&str> =
            state.records.values().map(|r| r.external_id.as_str()).collect();
        Ok(StoreSummary {
            total_records: state.records.len() as u64,
            unique_external_ids: unique.len() as u64,
            active_records: state.records.values().filter(|r| r.active).count() as u64,
        })
    }

    async fn reset(&self, force: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        state.validation_errors.clear();
        state.failures.clear();
        state.duplicates.clear();
        state.runs.clear();
        if force {
            state.records.clear();
        }
        Ok(())
    }
}

/// Convenience: a UTC instant for assertions.
pub fn utc(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap()
}
