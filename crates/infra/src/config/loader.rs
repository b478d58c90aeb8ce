//! Configuration loader
//!
//! Loads engine configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required variables are missing, falls back to loading from file
//! 3. Probes standard paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `SHEETSYNC_DB_PATH`: Database file path (required)
//! - `SHEETSYNC_DB_POOL_SIZE`: Connection pool size
//! - `SHEETSYNC_SPREADSHEET_ID`: Source spreadsheet id (required)
//! - `SHEETSYNC_SHEET_RANGE`: A1 range covering header and data columns
//! - `SHEETSYNC_CALENDAR_ID`: Destination calendar id
//! - `SHEETSYNC_TIME_ZONE`: IANA timezone for sheet timestamps
//! - `SHEETSYNC_VERIFY_EXISTENCE`: Check destination existence every run
//! - `SHEETSYNC_RUN_TIMEOUT_SECS`: Wall-clock ceiling per run
//! - `SHEETSYNC_MIN_CALL_INTERVAL_MS`: Outbound call spacing
//! - `SHEETSYNC_MAX_RETRIES`: Transient failure attempt ceiling
//! - `SHEETSYNC_RETRY_BACKOFF_MS`: First backoff delay
//!
//! ## File Locations
//! The loader probes `config.json`, `config.toml`, `sheetsync.json` and
//! `sheetsync.toml` in the current working directory.

use std::path::PathBuf;

use sheetsync_domain::{
    CalendarConfig, Config, DatabaseConfig, Result, SheetSyncError, SourceConfig, SyncConfig,
};

/// Load configuration with automatic fallback strategy.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "environment incomplete, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables.
///
/// `SHEETSYNC_DB_PATH` and `SHEETSYNC_SPREADSHEET_ID` are required; the
/// rest fall back to their defaults.
pub fn load_from_env() -> Result<Config> {
    let defaults = SyncConfig::default();

    Ok(Config {
        database: DatabaseConfig {
            path: env_var("SHEETSYNC_DB_PATH")?,
            pool_size: env_parsed("SHEETSYNC_DB_POOL_SIZE", 4)?,
        },
        source: SourceConfig {
            spreadsheet_id: env_var("SHEETSYNC_SPREADSHEET_ID")?,
            range: env_or("SHEETSYNC_SHEET_RANGE", "main_import!A:I"),
        },
        calendar: CalendarConfig {
            calendar_id: env_or("SHEETSYNC_CALENDAR_ID", "primary"),
            time_zone: env_or("SHEETSYNC_TIME_ZONE", "Africa/Cairo"),
        },
        sync: SyncConfig {
            verify_existence: env_bool("SHEETSYNC_VERIFY_EXISTENCE", defaults.verify_existence),
            run_timeout_seconds: env_parsed(
                "SHEETSYNC_RUN_TIMEOUT_SECS",
                defaults.run_timeout_seconds,
            )?,
            min_call_interval_ms: env_parsed(
                "SHEETSYNC_MIN_CALL_INTERVAL_MS",
                defaults.min_call_interval_ms,
            )?,
            max_retries: env_parsed("SHEETSYNC_MAX_RETRIES", defaults.max_retries)?,
            retry_initial_backoff_ms: env_parsed(
                "SHEETSYNC_RETRY_BACKOFF_MS",
                defaults.retry_initial_backoff_ms,
            )?,
        },
    })
}

/// Load configuration from a file.
///
/// If `path` is `None`, probes the standard locations. Format is detected
/// by extension: `.toml` parses as TOML, everything else as JSON.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SheetSyncError::Config(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SheetSyncError::Config("no config file found in any standard location".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SheetSyncError::Config(format!("failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &std::path::Path) -> Result<Config> {
    let is_toml = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        toml::from_str(contents)
            .map_err(|e| SheetSyncError::Config(format!("invalid TOML config: {e}")))
    } else {
        serde_json::from_str(contents)
            .map_err(|e| SheetSyncError::Config(format!("invalid JSON config: {e}")))
    }
}

fn probe_config_paths() -> Option<PathBuf> {
    ["config.json", "config.toml", "sheetsync.json", "sheetsync.toml"]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| SheetSyncError::Config(format!("missing environment variable: {name}")))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|_| SheetSyncError::Config(format!("invalid value for {name}: {value}"))),
        Err(_) => Ok(default),
    }
}
