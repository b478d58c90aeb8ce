//! Common data types used throughout the engine

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw row as fetched from the source sheet.
///
/// Cells are keyed by the sheet's header names (see [`crate::constants`]);
/// missing cells are simply absent from the map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRow {
    /// 1-based row number in the sheet (header row is 1)
    pub row_number: usize,
    pub columns: BTreeMap<String, String>,
}

impl RawRow {
    /// Cell value for the given header, trimmed; empty string when absent.
    pub fn cell(&self, header: &str) -> &str {
        self.columns.get(header).map(String::as_str).unwrap_or_default().trim()
    }
}

/// A parsed, validated event derived from one source row.
///
/// Exists only within a single reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCandidate {
    /// Source-provided identifier; recurring series repeat it across rows
    pub external_id: String,
    pub name: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Destination color id in 1..=11, when the row carries a usable one
    pub color: Option<u8>,
    /// Free-form category ("Event Type" column)
    pub category: String,
    pub is_focus_time: bool,
    pub last_modified: Option<DateTime<Utc>>,
    /// 1-based sheet row this candidate came from
    pub row_number: usize,
}

impl EventCandidate {
    /// Key that is unique per sync cycle: recurring rows share an external
    /// id but differ by start instant. Identical (id, start) pairs are true
    /// duplicates.
    pub fn unique_key(&self) -> String {
        format!("{}_{}", self.external_id, self.start.to_rfc3339())
    }
}

/// Persisted mapping from a unique source key to its destination
/// representation and last-known content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub unique_key: String,
    pub external_id: String,
    pub destination_event_id: String,
    pub content_hash: String,
    pub event_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub last_synced_at: DateTime<Utc>,
    /// false once the destination event was removed through the engine
    pub active: bool,
}

/// A row that failed validation; append-only log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub row_number: usize,
    pub event_name: String,
    pub reason: String,
    pub logged_at: DateTime<Utc>,
}

/// A candidate whose destination call failed; append-only log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedEvent {
    pub external_id: String,
    pub unique_key: String,
    pub event_name: String,
    pub row_number: usize,
    pub error: String,
    pub attempted_at: DateTime<Utc>,
}

/// Source rows sharing one unique key; recomputed per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateEntry {
    pub unique_key: String,
    pub external_id: String,
    pub event_name: String,
    pub occurrences: usize,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Every candidate was considered (individual errors may still be
    /// counted in `errors`)
    Completed,
    /// Aborted by a store failure; counts cover work done up to that point
    Partial,
    /// Truncated by the wall-clock timeout
    Incomplete,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Incomplete => "incomplete",
        }
    }

    /// Parse the stored text form; unknown values map to `Completed` so old
    /// rows stay readable.
    pub fn parse(value: &str) -> Self {
        match value {
            "partial" => Self::Partial,
            "incomplete" => Self::Incomplete,
            _ => Self::Completed,
        }
    }
}

/// Summary of one reconciliation run; append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub started_at: DateTime<Utc>,
    pub created: u32,
    pub updated: u32,
    pub skipped: u32,
    pub errors: u32,
    pub duration_seconds: f64,
    /// Origin of the run invocation (manual vs scheduled), kept for audit
    pub trigger_source: String,
    pub total_processed: u32,
    pub outcome: RunOutcome,
}

impl RunStats {
    /// Fresh stats for a run starting now.
    pub fn begin(trigger_source: &str) -> Self {
        Self {
            started_at: Utc::now(),
            created: 0,
            updated: 0,
            skipped: 0,
            errors: 0,
            duration_seconds: 0.0,
            trigger_source: trigger_source.to_string(),
            total_processed: 0,
            outcome: RunOutcome::Completed,
        }
    }
}

/// Aggregate counts over the persisted sync records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSummary {
    pub total_records: u64,
    pub unique_external_ids: u64,
    pub active_records: u64,
}

/// Aggregate view over the duplicate report of the latest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DuplicateSummary {
    pub keys_with_duplicates: u64,
    pub total_occurrences: u64,
}

/// Everything the stats operation returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    pub synced_events: StoreSummary,
    pub duplicates: DuplicateSummary,
    pub recent_runs: Vec<RunStats>,
    pub total_failed: u64,
    pub recent_failures: Vec<FailedEvent>,
    pub total_validation_errors: u64,
    pub recent_validation_errors: Vec<ValidationError>,
}

/// An active record whose destination event could not be fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingEvent {
    pub unique_key: String,
    pub event_name: String,
    pub start: DateTime<Utc>,
    pub reason: String,
}

/// An active record confirmed present in the destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedEvent {
    pub unique_key: String,
    pub event_name: String,
    pub destination_event_id: String,
    pub start: DateTime<Utc>,
}

/// Result of the read-only verify diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    pub total_in_database: usize,
    pub verified: usize,
    pub missing: usize,
    pub missing_events: Vec<MissingEvent>,
    pub verified_sample: Vec<VerifiedEvent>,
}

/// Result of a bulk range deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeDeletion {
    pub deleted: u32,
    pub failed: u32,
}
