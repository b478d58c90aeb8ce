//! Sheet row parser.
//!
//! Turns one raw sheet row into a typed [`EventCandidate`] or a
//! [`ValidationError`]. The decode is strict for fields that calendar
//! semantics depend on (identifier, name, start, end) and forgiving for
//! cosmetic ones (color, category, focus flag), which coerce to defaults.

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::constants::{
    COL_CATEGORY, COL_COLOR, COL_DESCRIPTION, COL_END, COL_EVENT_ID, COL_EVENT_NAME, COL_FOCUS,
    COL_LAST_MODIFIED, COL_START, MAX_COLOR_ID, MIN_COLOR_ID,
};
use crate::types::{EventCandidate, RawRow, ValidationError};

/// Timestamp grammars accepted from the sheet, tried in order. The first
/// entry is the canonical export format (`M/D/YYYY, h:mm:ss AM/PM`); the
/// rest cover hand-edited cells seen in practice.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%m/%d/%Y, %I:%M:%S %p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y, %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y, %I:%M:%S %p",
    "%d/%m/%Y %I:%M:%S %p",
];

/// Parse a raw row into a candidate, interpreting naive timestamps in `tz`.
///
/// Pure: the caller decides whether and where to persist the
/// [`ValidationError`].
pub fn parse_row(row: &RawRow, tz: Tz) -> Result<EventCandidate, ValidationError> {
    let name = row.cell(COL_EVENT_NAME);
    let mut reasons: Vec<String> = Vec::new();

    let external_id = row.cell(COL_EVENT_ID);
    if external_id.is_empty() {
        reasons.push("missing Event ID".to_string());
    }
    if name.is_empty() {
        reasons.push("event name is empty".to_string());
    }

    let start = parse_local_timestamp(row.cell(COL_START), tz)
        .map_err(|e| reasons.push(format!("invalid start date: {e}")))
        .ok();
    let end = parse_local_timestamp(row.cell(COL_END), tz)
        .map_err(|e| reasons.push(format!("invalid end date: {e}")))
        .ok();

    if let (Some(start), Some(end)) = (start, end) {
        if end <= start {
            reasons.push(format!("end time ({end}) must be after start time ({start})"));
        }
    }

    let (start, end) = match (start, end) {
        (Some(start), Some(end)) if reasons.is_empty() => (start, end),
        _ => {
            return Err(ValidationError {
                row_number: row.row_number,
                event_name: if name.is_empty() { "Unknown".to_string() } else { name.to_string() },
                reason: reasons.join("; "),
                logged_at: Utc::now(),
            });
        }
    };

    Ok(EventCandidate {
        external_id: external_id.to_string(),
        name: name.to_string(),
        description: row.cell(COL_DESCRIPTION).to_string(),
        start,
        end,
        color: parse_color(row.cell(COL_COLOR)),
        category: row.cell(COL_CATEGORY).to_string(),
        is_focus_time: parse_flag(row.cell(COL_FOCUS)),
        last_modified: parse_local_timestamp(row.cell(COL_LAST_MODIFIED), tz).ok(),
        row_number: row.row_number,
    })
}

/// Parse a naive sheet timestamp and anchor it to `tz`, yielding UTC.
fn parse_local_timestamp(raw: &str, tz: Tz) -> Result<DateTime<Utc>, String> {
    if raw.is_empty() {
        return Err("empty date string".to_string());
    }

    let naive = parse_naive(raw).ok_or_else(|| format!("could not parse date: {raw}"))?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        // DST fold: take the earlier instant
        LocalResult::Ambiguous(earlier, _) => Ok(earlier.with_timezone(&Utc)),
        LocalResult::None => Err(format!("time does not exist in {tz}: {raw}")),
    }
}

fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS.iter().find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Coerce a color cell to a destination color id; anything unusable is
/// dropped rather than failing the row.
fn parse_color(raw: &str) -> Option<u8> {
    let numeric = raw.parse::<f64>().ok()?;
    let id = numeric as i64;
    if (i64::from(MIN_COLOR_ID)..=i64::from(MAX_COLOR_ID)).contains(&id) {
        Some(id as u8)
    } else {
        None
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "yes" | "true" | "1")
}
