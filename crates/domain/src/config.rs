//! Configuration structures
//!
//! Plain data; loading from the environment or a file lives in the infra
//! crate's `config::loader`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

/// Source sheet settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Spreadsheet identifier
    pub spreadsheet_id: String,
    /// A1-notation range covering the header row and data columns
    #[serde(default = "default_range")]
    pub range: String,
}

/// Calendar destination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Destination calendar identifier
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    /// IANA timezone the sheet's naive timestamps are interpreted in
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
}

/// Reconciliation run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Verify destination existence on every sync pass (costs one get per
    /// unchanged record). When false, the stored record is trusted and
    /// existence is only checked by the explicit verify operation.
    #[serde(default)]
    pub verify_existence: bool,
    /// Hard wall-clock ceiling for a single run
    #[serde(default = "default_run_timeout")]
    pub run_timeout_seconds: u64,
    /// Minimum spacing between outbound calendar calls
    #[serde(default = "default_call_interval")]
    pub min_call_interval_ms: u64,
    /// Attempt ceiling for transient calendar failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First backoff delay; doubles per attempt
    #[serde(default = "default_retry_backoff")]
    pub retry_initial_backoff_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            verify_existence: false,
            run_timeout_seconds: default_run_timeout(),
            min_call_interval_ms: default_call_interval(),
            max_retries: default_max_retries(),
            retry_initial_backoff_ms: default_retry_backoff(),
        }
    }
}

impl SyncConfig {
    /// Wall-clock ceiling as a [`Duration`].
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_seconds)
    }

    /// Minimum inter-call spacing as a [`Duration`].
    pub fn min_call_interval(&self) -> Duration {
        Duration::from_millis(self.min_call_interval_ms)
    }

    /// First backoff delay as a [`Duration`].
    pub fn retry_initial_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_initial_backoff_ms)
    }
}

fn default_pool_size() -> u32 {
    4
}

fn default_range() -> String {
    "main_import!A:I".to_string()
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_time_zone() -> String {
    "Africa/Cairo".to_string()
}

fn default_run_timeout() -> u64 {
    540
}

fn default_call_interval() -> u64 {
    500
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    1000
}
