//! Reconciliation engine: duplicate tracking and the per-candidate
//! create/update/skip/recreate state machine.

mod duplicates;
mod engine;

pub use duplicates::{partition_duplicates, DuplicatePartition};
pub use engine::{SyncEngine, SyncEngineConfig};
