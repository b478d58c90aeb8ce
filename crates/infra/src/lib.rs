//! # SheetSync Infra
//!
//! Infrastructure adapters behind the core's port traits.
//!
//! This crate contains:
//! - SQLite-backed sync state store (rusqlite + r2d2 pool)
//! - Google Calendar destination client and the throttled decorator that
//!   composes rate limiting and bounded retry around any calendar port
//! - Google Sheets source client
//! - Configuration loader (environment first, file fallback)
//!
//! ## Architecture Principles
//! - Implements `sheetsync-core` ports; contains no reconciliation logic
//! - All external failures are converted into domain errors at this
//!   boundary (see `errors`)

pub mod auth;
pub mod bootstrap;
pub mod calendar;
pub mod config;
pub mod database;
pub mod errors;
pub mod resilience;
pub mod source;

pub use auth::{AccessTokenProvider, StaticTokenProvider};
pub use bootstrap::build_engine;
pub use calendar::{GoogleCalendarClient, ThrottledCalendar};
pub use database::{DbManager, SqliteSyncStateStore};
pub use errors::InfraError;
pub use resilience::{retry_transient, RateLimiter, RetryPolicy};
pub use source::SheetsSourceClient;
