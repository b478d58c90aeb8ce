//! Calendar destination adapter.

mod client;
mod throttled;

pub use client::GoogleCalendarClient;
pub use throttled::ThrottledCalendar;
