//! # SheetSync Core
//!
//! Pure reconciliation logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the calendar destination, the
//!   row source and the durable sync state store
//! - The reconciliation engine (create/update/skip/recreate state machine,
//!   duplicate tracking, run orchestration and diagnostics)
//!
//! ## Architecture Principles
//! - Only depends on `sheetsync-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod payload;
pub mod ports;
pub mod sync;

// Re-export specific items to avoid ambiguity
pub use payload::EventPayload;
pub use ports::{CalendarPort, DestinationEvent, SourcePort, SyncStateStore};
pub use sync::{SyncEngine, SyncEngineConfig};
