//! Error types used throughout the engine

use thiserror::Error;

/// Failure class reported by the calendar destination.
///
/// The class decides retry behaviour: `RateLimited` and `Network` are
/// transient and eligible for backoff, `NotFound` signals an event that no
/// longer exists in the destination, everything else is `Api`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarFailure {
    /// Quota or rate errors (HTTP 403/429).
    RateLimited,
    /// The destination event does not exist (HTTP 404/410).
    NotFound,
    /// Transport-level failure (connection, DNS, timeout).
    Network,
    /// Any other API rejection.
    Api,
}

/// Main error type for SheetSync
#[derive(Error, Debug)]
pub enum SheetSyncError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("Calendar error: {message}")]
    Calendar {
        kind: CalendarFailure,
        message: String,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("a sync run is already in progress")]
    Busy,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SheetSyncError {
    /// Build a calendar error with an explicit failure class.
    pub fn calendar(kind: CalendarFailure, message: impl Into<String>) -> Self {
        Self::Calendar { kind, message: message.into() }
    }

    /// Whether the error is worth retrying with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Calendar { kind: CalendarFailure::RateLimited | CalendarFailure::Network, .. }
        )
    }

    /// Whether the error means the destination event is gone.
    pub fn is_missing_destination(&self) -> bool {
        matches!(self, Self::Calendar { kind: CalendarFailure::NotFound, .. })
    }

    /// Store failures are the one class that aborts a run.
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

/// Result type alias for SheetSync operations
pub type Result<T> = std::result::Result<T, SheetSyncError>;
