//! Composition root: wire the adapters into a ready-to-run engine.
//!
//! The invoking host (HTTP handler, CLI, scheduler) supplies the loaded
//! configuration and a credential context, and gets back an engine whose
//! calendar traffic is already paced and retried.

use std::sync::Arc;

use sheetsync_core::ports::{CalendarPort, SourcePort, SyncStateStore};
use sheetsync_core::{SyncEngine, SyncEngineConfig};
use sheetsync_domain::{Config, Result};
use tracing::info;

use crate::auth::AccessTokenProvider;
use crate::calendar::{GoogleCalendarClient, ThrottledCalendar};
use crate::database::{DbManager, SqliteSyncStateStore};
use crate::source::SheetsSourceClient;

/// Build a fully wired engine from configuration.
///
/// Opens the database (running migrations), then assembles the throttled
/// Google Calendar client, the Sheets source and the SQLite store around
/// the core engine.
pub fn build_engine(config: &Config, tokens: Arc<dyn AccessTokenProvider>) -> Result<SyncEngine> {
    let engine_config = SyncEngineConfig::from_config(config)?;

    let db = DbManager::new(&config.database.path, config.database.pool_size)?;
    db.run_migrations()?;
    db.health_check()?;

    let store: Arc<dyn SyncStateStore> = Arc::new(SqliteSyncStateStore::new(&db));

    let calendar_client =
        GoogleCalendarClient::new(config.calendar.calendar_id.clone(), Arc::clone(&tokens));
    let calendar: Arc<dyn CalendarPort> = Arc::new(ThrottledCalendar::from_config(
        Arc::new(calendar_client) as Arc<dyn CalendarPort>,
        &config.sync,
    ));

    let source: Arc<dyn SourcePort> =
        Arc::new(SheetsSourceClient::new(&config.source, tokens));

    info!(
        calendar_id = %config.calendar.calendar_id,
        spreadsheet_id = %config.source.spreadsheet_id,
        "engine assembled"
    );

    Ok(SyncEngine::new(calendar, source, store, engine_config))
}
