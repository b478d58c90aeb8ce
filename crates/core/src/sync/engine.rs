//! The reconciliation engine.
//!
//! One logical run per trigger: fetch rows, validate, suppress duplicates,
//! then walk the per-candidate state machine against the durable store and
//! the calendar destination. Candidate failures are isolated; store
//! failures abort the remainder of the run.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use chrono_tz::Tz;
use sheetsync_domain::constants::{
    LISTING_LIMIT, RECENT_FAILURES_LIMIT, RECENT_RUNS_LIMIT, VERIFY_MISSING_LIMIT,
    VERIFY_SAMPLE_LIMIT,
};
use sheetsync_domain::{
    content_hash, parse_row, Config, DuplicateSummary, EventCandidate, FailedEvent, MissingEvent,
    RangeDeletion, Result, RunOutcome, RunStats, SheetSyncError, StatsReport, SyncRecord,
    ValidationError, VerifiedEvent, VerifyReport,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::duplicates::partition_duplicates;
use crate::payload::EventPayload;
use crate::ports::{CalendarPort, SourcePort, SyncStateStore};

/// Engine settings derived from the application config.
#[derive(Debug, Clone)]
pub struct SyncEngineConfig {
    /// Timezone sheet timestamps are interpreted in and events are
    /// rendered in at the destination
    pub time_zone: Tz,
    /// Check destination existence for hash-unchanged records on every run
    pub verify_existence: bool,
    /// Hard wall-clock ceiling for a single run
    pub run_timeout: std::time::Duration,
}

impl SyncEngineConfig {
    /// Derive engine settings from the loaded [`Config`].
    pub fn from_config(config: &Config) -> Result<Self> {
        let time_zone: Tz = config.calendar.time_zone.parse().map_err(|_| {
            SheetSyncError::Config(format!("invalid timezone: {}", config.calendar.time_zone))
        })?;
        Ok(Self {
            time_zone,
            verify_existence: config.sync.verify_existence,
            run_timeout: config.sync.run_timeout(),
        })
    }
}

/// What the state machine decided for one candidate.
enum CandidateAction {
    Created,
    Updated,
    Skipped,
}

/// Reconciliation engine wiring the ports together.
///
/// The store is the only shared mutable resource; the run lock makes whole
/// runs (and the other mutating operations) mutually exclusive. An
/// overlapping trigger is rejected immediately with
/// [`SheetSyncError::Busy`] rather than queued.
pub struct SyncEngine {
    calendar: Arc<dyn CalendarPort>,
    source: Arc<dyn SourcePort>,
    store: Arc<dyn SyncStateStore>,
    config: SyncEngineConfig,
    run_lock: Mutex<()>,
}

impl SyncEngine {
    /// Create a new engine instance.
    pub fn new(
        calendar: Arc<dyn CalendarPort>,
        source: Arc<dyn SourcePort>,
        store: Arc<dyn SyncStateStore>,
        config: SyncEngineConfig,
    ) -> Self {
        Self { calendar, source, store, config, run_lock: Mutex::new(()) }
    }

    /// Run one full reconciliation pass.
    ///
    /// Always returns a structured summary when the run was admitted:
    /// per-candidate errors are counted in `errors`, a store failure ends
    /// the run with `outcome = Partial`, the wall-clock ceiling ends it
    /// with `outcome = Incomplete`.
    #[instrument(skip(self))]
    pub async fn run_sync(&self, trigger_source: &str) -> Result<RunStats> {
        let _guard = self.run_lock.try_lock().map_err(|_| SheetSyncError::Busy)?;

        let run_started = Instant::now();
        let deadline = run_started + self.config.run_timeout;
        let mut stats = RunStats::begin(trigger_source);

        info!(trigger_source, "starting sync run");

        let rows = self.source.fetch_rows().await?;
        debug!(rows = rows.len(), "fetched source rows");

        let mut candidates: Vec<EventCandidate> = Vec::with_capacity(rows.len());
        let mut validation_errors: Vec<ValidationError> = Vec::new();
        for row in &rows {
            match parse_row(row, self.config.time_zone) {
                Ok(candidate) => candidates.push(candidate),
                Err(invalid) => validation_errors.push(invalid),
            }
        }

        if !validation_errors.is_empty() {
            warn!(count = validation_errors.len(), "rows failed validation");
            self.store.append_validation_errors(&validation_errors).await?;
        }

        let partition = partition_duplicates(candidates);
        self.store.record_duplicates(&partition.duplicates).await?;

        stats.total_processed = (partition.primaries.len() + partition.extra_occurrences) as u32;
        stats.skipped += partition.extra_occurrences as u32;

        for candidate in &partition.primaries {
            if Instant::now() >= deadline {
                warn!(
                    processed = stats.created + stats.updated + stats.skipped + stats.errors,
                    "run timeout reached; truncating"
                );
                stats.outcome = RunOutcome::Incomplete;
                break;
            }

            match self.reconcile_candidate(candidate).await {
                Ok(CandidateAction::Created) => stats.created += 1,
                Ok(CandidateAction::Updated) => stats.updated += 1,
                Ok(CandidateAction::Skipped) => stats.skipped += 1,
                Err(err) if err.is_store() => {
                    error!(error = %err, "store failure; aborting run");
                    stats.errors += 1;
                    stats.outcome = RunOutcome::Partial;
                    break;
                }
                Err(err) => {
                    stats.errors += 1;
                    error!(
                        row = candidate.row_number,
                        name = %candidate.name,
                        error = %err,
                        "failed to sync candidate"
                    );
                    let failure = FailedEvent {
                        external_id: candidate.external_id.clone(),
                        unique_key: candidate.unique_key(),
                        event_name: candidate.name.clone(),
                        row_number: candidate.row_number,
                        error: err.to_string(),
                        attempted_at: Utc::now(),
                    };
                    if let Err(store_err) = self.store.append_failure(&failure).await {
                        error!(error = %store_err, "store failure; aborting run");
                        stats.outcome = RunOutcome::Partial;
                        break;
                    }
                }
            }
        }

        stats.duration_seconds = run_started.elapsed().as_secs_f64();

        // Best effort: a run that produced work should not be lost because
        // the final log write failed.
        if let Err(err) = self.store.append_run_stats(&stats).await {
            error!(error = %err, "failed to persist run stats");
        }

        info!(
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped,
            errors = stats.errors,
            outcome = stats.outcome.as_str(),
            "sync run finished"
        );

        Ok(stats)
    }

    /// Decide and execute create/update/skip/recreate for one candidate.
    async fn reconcile_candidate(&self, candidate: &EventCandidate) -> Result<CandidateAction> {
        let unique_key = candidate.unique_key();
        let hash = content_hash(candidate);
        let payload = EventPayload::from_candidate(candidate, self.config.time_zone.name());

        let existing = self.store.get(&unique_key).await?;

        let record = match existing {
            None => {
                return self
                    .create_destination_event(candidate, &unique_key, &hash, &payload)
                    .await
                    .map(|()| CandidateAction::Created);
            }
            Some(record) if !record.active => {
                debug!(%unique_key, "record inactive; recreating");
                return self
                    .create_destination_event(candidate, &unique_key, &hash, &payload)
                    .await
                    .map(|()| CandidateAction::Created);
            }
            Some(record) => record,
        };

        if record.content_hash == hash {
            if self.config.verify_existence && !self.destination_has(&record).await? {
                info!(%unique_key, "destination event missing; recreating");
                return self
                    .create_destination_event(candidate, &unique_key, &hash, &payload)
                    .await
                    .map(|()| CandidateAction::Created);
            }
            debug!(%unique_key, "content unchanged; skipping");
            let mut refreshed = record;
            refreshed.last_synced_at = Utc::now();
            self.store.upsert(&refreshed).await?;
            return Ok(CandidateAction::Skipped);
        }

        match self.calendar.update_event(&record.destination_event_id, &payload).await {
            Ok(()) => {
                info!(%unique_key, "updated destination event");
                self.store
                    .upsert(&SyncRecord {
                        content_hash: hash,
                        event_name: candidate.name.clone(),
                        start: candidate.start,
                        end: candidate.end,
                        last_synced_at: Utc::now(),
                        ..record
                    })
                    .await?;
                Ok(CandidateAction::Updated)
            }
            Err(err) if err.is_missing_destination() => {
                info!(%unique_key, "update hit a missing event; recreating");
                self.create_destination_event(candidate, &unique_key, &hash, &payload)
                    .await
                    .map(|()| CandidateAction::Created)
            }
            Err(err) => Err(err),
        }
    }

    /// Create the destination event and persist the fresh record.
    async fn create_destination_event(
        &self,
        candidate: &EventCandidate,
        unique_key: &str,
        hash: &str,
        payload: &EventPayload,
    ) -> Result<()> {
        let destination_event_id = self.calendar.create_event(payload).await?;
        info!(unique_key, %destination_event_id, "created destination event");

        self.store
            .upsert(&SyncRecord {
                unique_key: unique_key.to_string(),
                external_id: candidate.external_id.clone(),
                destination_event_id,
                content_hash: hash.to_string(),
                event_name: candidate.name.clone(),
                start: candidate.start,
                end: candidate.end,
                last_synced_at: Utc::now(),
                active: true,
            })
            .await
    }

    /// Lightweight existence check. When the destination cannot answer
    /// (transient failure), the stored record is trusted instead of
    /// recreating needlessly.
    async fn destination_has(&self, record: &SyncRecord) -> Result<bool> {
        match self.calendar.get_event(&record.destination_event_id).await {
            Ok(event) => Ok(!event.is_cancelled()),
            Err(err) if err.is_missing_destination() => Ok(false),
            Err(err) if err.is_transient() => {
                warn!(
                    unique_key = %record.unique_key,
                    error = %err,
                    "existence check unavailable; trusting stored record"
                );
                Ok(true)
            }
            Err(err) => Err(err),
        }
    }

    /// Delete destination events whose start falls inside
    /// `[now - days_before, now + days_after]`, marking their records
    /// inactive. Per-record failures are counted, never fatal.
    #[instrument(skip(self))]
    pub async fn delete_range(&self, days_before: i64, days_after: i64) -> Result<RangeDeletion> {
        if days_before < 0 || days_after < 0 {
            return Err(SheetSyncError::InvalidInput(
                "day offsets must be non-negative".to_string(),
            ));
        }

        let _guard = self.run_lock.try_lock().map_err(|_| SheetSyncError::Busy)?;

        let now = Utc::now();
        let window_start = now - Duration::days(days_before);
        let window_end = now + Duration::days(days_after);

        info!(%window_start, %window_end, "deleting events in range");

        let mut outcome = RangeDeletion::default();
        let records = self.store.list_active().await?;

        for record in
            records.iter().filter(|r| r.start >= window_start && r.start <= window_end)
        {
            match self.calendar.delete_event(&record.destination_event_id).await {
                // An already-gone event still ends up deleted
                Ok(()) => {
                    self.store.mark_inactive(&record.unique_key).await?;
                    outcome.deleted += 1;
                    debug!(unique_key = %record.unique_key, "deleted destination event");
                }
                Err(err) if err.is_missing_destination() => {
                    self.store.mark_inactive(&record.unique_key).await?;
                    outcome.deleted += 1;
                }
                Err(err) => {
                    warn!(
                        unique_key = %record.unique_key,
                        error = %err,
                        "failed to delete destination event"
                    );
                    outcome.failed += 1;
                }
            }
        }

        info!(deleted = outcome.deleted, failed = outcome.failed, "range deletion finished");
        Ok(outcome)
    }

    /// Read-only diagnostic: check every active record against the
    /// destination without mutating any state.
    #[instrument(skip(self))]
    pub async fn verify(&self) -> Result<VerifyReport> {
        let records = self.store.list_active().await?;

        let mut report = VerifyReport {
            total_in_database: records.len(),
            verified: 0,
            missing: 0,
            missing_events: Vec::new(),
            verified_sample: Vec::new(),
        };

        for record in &records {
            let reason = match self.calendar.get_event(&record.destination_event_id).await {
                Ok(event) if !event.is_cancelled() => {
                    report.verified += 1;
                    if report.verified_sample.len() < VERIFY_SAMPLE_LIMIT {
                        report.verified_sample.push(VerifiedEvent {
                            unique_key: record.unique_key.clone(),
                            event_name: record.event_name.clone(),
                            destination_event_id: record.destination_event_id.clone(),
                            start: record.start,
                        });
                    }
                    continue;
                }
                Ok(_) => "cancelled".to_string(),
                Err(err) if err.is_missing_destination() => "not_found".to_string(),
                Err(err) => err.to_string(),
            };

            report.missing += 1;
            if report.missing_events.len() < VERIFY_MISSING_LIMIT {
                report.missing_events.push(MissingEvent {
                    unique_key: record.unique_key.clone(),
                    event_name: record.event_name.clone(),
                    start: record.start,
                    reason,
                });
            }
        }

        info!(
            total = report.total_in_database,
            verified = report.verified,
            missing = report.missing,
            "verify finished"
        );
        Ok(report)
    }

    /// Aggregate statistics over the store.
    pub async fn get_stats(&self) -> Result<StatsReport> {
        let duplicates = self.store.list_duplicates().await?;
        let duplicate_summary = DuplicateSummary {
            keys_with_duplicates: duplicates.len() as u64,
            total_occurrences: duplicates.iter().map(|d| d.occurrences as u64).sum(),
        };

        Ok(StatsReport {
            synced_events: self.store.summary().await?,
            duplicates: duplicate_summary,
            recent_runs: self.store.recent_runs(RECENT_RUNS_LIMIT).await?,
            total_failed: self.store.count_failures().await?,
            recent_failures: self.store.recent_failures(RECENT_FAILURES_LIMIT).await?,
            total_validation_errors: self.store.count_validation_errors().await?,
            recent_validation_errors: self
                .store
                .recent_validation_errors(RECENT_FAILURES_LIMIT)
                .await?,
        })
    }

    /// Clear transient logs; with `force` also drop every sync record.
    #[instrument(skip(self))]
    pub async fn reset_state(&self, force: bool) -> Result<()> {
        let _guard = self.run_lock.try_lock().map_err(|_| SheetSyncError::Busy)?;
        self.store.reset(force).await?;
        info!(force, "sync state reset");
        Ok(())
    }

    /// Recent validation errors, newest first.
    pub async fn list_validation_errors(&self) -> Result<Vec<ValidationError>> {
        self.store.recent_validation_errors(LISTING_LIMIT).await
    }

    /// Duplicate report from the latest run.
    pub async fn list_duplicates(&self) -> Result<Vec<sheetsync_domain::DuplicateEntry>> {
        self.store.list_duplicates().await
    }
}
