//! SQLite-backed implementation of the SyncStateStore port.
//!
//! rusqlite is blocking, so every operation hops onto the blocking thread
//! pool; the r2d2 pool itself is cheap to clone into the closure.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, Row};
use sheetsync_core::ports::SyncStateStore;
use sheetsync_domain::{
    DuplicateEntry, FailedEvent, Result, RunOutcome, RunStats, SheetSyncError, StoreSummary,
    SyncRecord, ValidationError,
};
use tracing::debug;

use super::manager::DbManager;
use crate::errors::InfraError;

/// SQLite implementation of the sync state store.
pub struct SqliteSyncStateStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteSyncStateStore {
    /// Create a store over the manager's pool.
    pub fn new(manager: &DbManager) -> Self {
        Self { pool: manager.pool().clone() }
    }

    /// Run blocking database work on the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(InfraError::from)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| SheetSyncError::Internal(format!("blocking store task failed: {e}")))?
    }
}

fn epoch_to_datetime(column: usize, value: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp(value, 0)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, value))
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<SyncRecord> {
    Ok(SyncRecord {
        unique_key: row.get(0)?,
        external_id: row.get(1)?,
        destination_event_id: row.get(2)?,
        content_hash: row.get(3)?,
        event_name: row.get(4)?,
        start: epoch_to_datetime(5, row.get(5)?)?,
        end: epoch_to_datetime(6, row.get(6)?)?,
        last_synced_at: epoch_to_datetime(7, row.get(7)?)?,
        active: row.get(8)?,
    })
}

const RECORD_COLUMNS: &str = "unique_key, external_id, destination_event_id, content_hash,
    event_name, start_ts, end_ts, last_synced_at, active";

#[async_trait]
impl SyncStateStore for SqliteSyncStateStore {
    async fn get(&self, unique_key: &str) -> Result<Option<SyncRecord>> {
        let key = unique_key.to_string();
        self.with_conn(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM sync_records WHERE unique_key = ?1"),
                params![key],
                row_to_record,
            );
            match result {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(InfraError::from(e).into()),
            }
        })
        .await
    }

    async fn upsert(&self, record: &SyncRecord) -> Result<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sync_records (
                    unique_key, external_id, destination_event_id, content_hash,
                    event_name, start_ts, end_ts, last_synced_at, active
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(unique_key) DO UPDATE SET
                    external_id = excluded.external_id,
                    destination_event_id = excluded.destination_event_id,
                    content_hash = excluded.content_hash,
                    event_name = excluded.event_name,
                    start_ts = excluded.start_ts,
                    end_ts = excluded.end_ts,
                    last_synced_at = excluded.last_synced_at,
                    active = excluded.active",
                params![
                    record.unique_key,
                    record.external_id,
                    record.destination_event_id,
                    record.content_hash,
                    record.event_name,
                    record.start.timestamp(),
                    record.end.timestamp(),
                    record.last_synced_at.timestamp(),
                    record.active,
                ],
            )
            .map_err(InfraError::from)?;
            debug!(unique_key = %record.unique_key, "upserted sync record");
            Ok(())
        })
        .await
    }

    async fn mark_inactive(&self, unique_key: &str) -> Result<()> {
        let key = unique_key.to_string();
        self.with_conn(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE sync_records SET active = 0 WHERE unique_key = ?1",
                    params![key],
                )
                .map_err(InfraError::from)?;
            if changed == 0 {
                return Err(SheetSyncError::NotFound(format!("no sync record for {key}")));
            }
            Ok(())
        })
        .await
    }

    async fn list_active(&self) -> Result<Vec<SyncRecord>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {RECORD_COLUMNS} FROM sync_records
                     WHERE active = 1 ORDER BY start_ts ASC"
                ))
                .map_err(InfraError::from)?;
            let records = stmt
                .query_map([], row_to_record)
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;
            Ok(records)
        })
        .await
    }

    async fn append_validation_errors(&self, errors: &[ValidationError]) -> Result<()> {
        if errors.is_empty() {
            return Ok(());
        }
        let errors = errors.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(InfraError::from)?;
            {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO validation_errors (row_number, event_name, reason, logged_at)
                         VALUES (?1, ?2, ?3, ?4)",
                    )
                    .map_err(InfraError::from)?;
                for error in &errors {
                    stmt.execute(params![
                        error.row_number as i64,
                        error.event_name,
                        error.reason,
                        error.logged_at.timestamp(),
                    ])
                    .map_err(InfraError::from)?;
                }
            }
            tx.commit().map_err(InfraError::from)?;
            Ok(())
        })
        .await
    }

    async fn append_failure(&self, failure: &FailedEvent) -> Result<()> {
        let failure = failure.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO failed_events
                    (external_id, unique_key, event_name, row_number, error, attempted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    failure.external_id,
                    failure.unique_key,
                    failure.event_name,
                    failure.row_number as i64,
                    failure.error,
                    failure.attempted_at.timestamp(),
                ],
            )
            .map_err(InfraError::from)?;
            Ok(())
        })
        .await
    }

    async fn record_duplicates(&self, duplicates: &[DuplicateEntry]) -> Result<()> {
        let duplicates = duplicates.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(InfraError::from)?;
            // The report describes the latest run only
            tx.execute("DELETE FROM duplicate_events", []).map_err(InfraError::from)?;
            {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO duplicate_events
                            (unique_key, external_id, event_name, occurrences)
                         VALUES (?1, ?2, ?3, ?4)",
                    )
                    .map_err(InfraError::from)?;
                for duplicate in &duplicates {
                    stmt.execute(params![
                        duplicate.unique_key,
                        duplicate.external_id,
                        duplicate.event_name,
                        duplicate.occurrences as i64,
                    ])
                    .map_err(InfraError::from)?;
                }
            }
            tx.commit().map_err(InfraError::from)?;
            Ok(())
        })
        .await
    }

    async fn append_run_stats(&self, stats: &RunStats) -> Result<()> {
        let stats = stats.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO run_log
                    (started_at, created, updated, skipped, errors, duration_seconds,
                     trigger_source, total_processed, outcome)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    stats.started_at.timestamp(),
                    stats.created,
                    stats.updated,
                    stats.skipped,
                    stats.errors,
                    stats.duration_seconds,
                    stats.trigger_source,
                    stats.total_processed,
                    stats.outcome.as_str(),
                ],
            )
            .map_err(InfraError::from)?;
            Ok(())
        })
        .await
    }

    async fn recent_runs(&self, limit: usize) -> Result<Vec<RunStats>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT started_at, created, updated, skipped, errors, duration_seconds,
                            trigger_source, total_processed, outcome
                     FROM run_log ORDER BY id DESC LIMIT ?1",
                )
                .map_err(InfraError::from)?;
            let runs = stmt
                .query_map(params![limit as i64], |row| {
                    Ok(RunStats {
                        started_at: epoch_to_datetime(0, row.get(0)?)?,
                        created: row.get(1)?,
                        updated: row.get(2)?,
                        skipped: row.get(3)?,
                        errors: row.get(4)?,
                        duration_seconds: row.get(5)?,
                        trigger_source: row.get(6)?,
                        total_processed: row.get(7)?,
                        outcome: RunOutcome::parse(&row.get::<_, String>(8)?),
                    })
                })
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;
            Ok(runs)
        })
        .await
    }

    async fn recent_failures(&self, limit: usize) -> Result<Vec<FailedEvent>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT external_id, unique_key, event_name, row_number, error, attempted_at
                     FROM failed_events ORDER BY id DESC LIMIT ?1",
                )
                .map_err(InfraError::from)?;
            let failures = stmt
                .query_map(params![limit as i64], |row| {
                    Ok(FailedEvent {
                        external_id: row.get(0)?,
                        unique_key: row.get(1)?,
                        event_name: row.get(2)?,
                        row_number: row.get::<_, i64>(3)? as usize,
                        error: row.get(4)?,
                        attempted_at: epoch_to_datetime(5, row.get(5)?)?,
                    })
                })
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;
            Ok(failures)
        })
        .await
    }

    async fn recent_validation_errors(&self, limit: usize) -> Result<Vec<ValidationError>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT row_number, event_name, reason, logged_at
                     FROM validation_errors ORDER BY id DESC LIMIT ?1",
                )
                .map_err(InfraError::from)?;
            let errors = stmt
                .query_map(params![limit as i64], |row| {
                    Ok(ValidationError {
                        row_number: row.get::<_, i64>(0)? as usize,
                        event_name: row.get(1)?,
                        reason: row.get(2)?,
                        logged_at: epoch_to_datetime(3, row.get(3)?)?,
                    })
                })
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;
            Ok(errors)
        })
        .await
    }

    async fn count_failures(&self) -> Result<u64> {
        self.with_conn(move |conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM failed_events", [], |row| row.get(0))
                .map_err(InfraError::from)?;
            Ok(count as u64)
        })
        .await
    }

    async fn count_validation_errors(&self) -> Result<u64> {
        self.with_conn(move |conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM validation_errors", [], |row| row.get(0))
                .map_err(InfraError::from)?;
            Ok(count as u64)
        })
        .await
    }

    async fn list_duplicates(&self) -> Result<Vec<DuplicateEntry>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT unique_key, external_id, event_name, occurrences
                     FROM duplicate_events ORDER BY occurrences DESC",
                )
                .map_err(InfraError::from)?;
            let duplicates = stmt
                .query_map([], |row| {
                    Ok(DuplicateEntry {
                        unique_key: row.get(0)?,
                        external_id: row.get(1)?,
                        event_name: row.get(2)?,
                        occurrences: row.get::<_, i64>(3)? as usize,
                    })
                })
                .map_err(InfraError::from)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(InfraError::from)?;
            Ok(duplicates)
        })
        .await
    }

    async fn summary(&self) -> Result<StoreSummary> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT COUNT(*),
                        COUNT(DISTINCT external_id),
                        COALESCE(SUM(active), 0)
                 FROM sync_records",
                [],
                |row| {
                    Ok(StoreSummary {
                        total_records: row.get::<_, i64>(0)? as u64,
                        unique_external_ids: row.get::<_, i64>(1)? as u64,
                        active_records: row.get::<_, i64>(2)? as u64,
                    })
                },
            )
            .map_err(|e| InfraError::from(e).into())
        })
        .await
    }

    async fn reset(&self, force: bool) -> Result<()> {
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(InfraError::from)?;
            tx.execute("DELETE FROM validation_errors", []).map_err(InfraError::from)?;
            tx.execute("DELETE FROM failed_events", []).map_err(InfraError::from)?;
            tx.execute("DELETE FROM run_log", []).map_err(InfraError::from)?;
            tx.execute("DELETE FROM duplicate_events", []).map_err(InfraError::from)?;
            if force {
                tx.execute("DELETE FROM sync_records", []).map_err(InfraError::from)?;
            }
            tx.commit().map_err(InfraError::from)?;
            debug!(force, "reset sync state");
            Ok(())
        })
        .await
    }
}
