//! Calendar-facing projection of an event candidate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sheetsync_domain::utils::text;
use sheetsync_domain::EventCandidate;

/// What the destination adapter sends over the wire. Provider-neutral; the
/// adapter owns the actual wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    pub summary: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// IANA timezone the destination should render the event in
    pub time_zone: String,
    /// Destination color id ("1".."11")
    pub color_id: Option<String>,
    pub focus_time: bool,
}

impl EventPayload {
    /// Build the payload for a candidate.
    ///
    /// The category column carries well-known type names that map onto
    /// fixed destination colors; an explicit color id from the row is the
    /// fallback. The description is sent markup-free and size-bounded.
    pub fn from_candidate(candidate: &EventCandidate, time_zone: &str) -> Self {
        let description = Some(text::clean_description(&candidate.description))
            .filter(|d| !d.is_empty());

        let color_id = category_color(&candidate.category)
            .map(str::to_string)
            .or_else(|| candidate.color.map(|c| c.to_string()));

        Self {
            summary: candidate.name.trim().to_string(),
            description,
            start: candidate.start,
            end: candidate.end,
            time_zone: time_zone.to_string(),
            color_id,
            focus_time: candidate.is_focus_time,
        }
    }
}

fn category_color(category: &str) -> Option<&'static str> {
    match category.trim().to_uppercase().replace(' ', "_").as_str() {
        "DEFAULT" => Some("1"),
        "FOCUS_TIME" => Some("2"),
        "OUT_OF_OFFICE" => Some("4"),
        "WORKING_LOCATION" => Some("5"),
        _ => None,
    }
}
