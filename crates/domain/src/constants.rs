//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! engine.

// Source sheet column headers
pub const COL_EVENT_ID: &str = "Event ID";
pub const COL_EVENT_NAME: &str = "Event Name";
pub const COL_DESCRIPTION: &str = "Description";
pub const COL_START: &str = "Start Date/Time";
pub const COL_END: &str = "End Date/Time";
pub const COL_COLOR: &str = "Color";
pub const COL_CATEGORY: &str = "Event Type";
pub const COL_FOCUS: &str = "Focus Time";
pub const COL_LAST_MODIFIED: &str = "Last Modified";

// Calendar payload limits
pub const MAX_DESCRIPTION_LENGTH: usize = 8000;
pub const MIN_COLOR_ID: u8 = 1;
pub const MAX_COLOR_ID: u8 = 11;

// Report sizes
pub const RECENT_RUNS_LIMIT: usize = 10;
pub const RECENT_FAILURES_LIMIT: usize = 10;
pub const LISTING_LIMIT: usize = 100;
pub const VERIFY_MISSING_LIMIT: usize = 20;
pub const VERIFY_SAMPLE_LIMIT: usize = 5;
