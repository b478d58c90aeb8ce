//! Content fingerprinting.
//!
//! The hash answers exactly one question: did anything meaningful change
//! since the last sync. It covers the tuple (name, description, start, end,
//! color, category, focus flag) and nothing else; `last_modified`, row
//! numbers and wall-clock time never enter the payload, so re-hashing an
//! unchanged candidate is stable across process restarts.
//!
//! Normalization rules (pinned because they decide idempotence):
//! - name and category are trimmed; category is lowercased
//! - description is markup-stripped and whitespace-collapsed, so pure
//!   formatting edits do not produce an update
//! - timestamps are rendered as RFC 3339 UTC with second precision
//! - an absent color renders as the empty string

use sha2::{Digest, Sha256};

use crate::types::EventCandidate;
use crate::utils::text;

/// Deterministic SHA-256 fingerprint of a candidate's meaningful content.
pub fn content_hash(candidate: &EventCandidate) -> String {
    hex::encode(Sha256::digest(canonical_content(candidate).as_bytes()))
}

fn canonical_content(candidate: &EventCandidate) -> String {
    let color = candidate.color.map(|c| c.to_string()).unwrap_or_default();
    format!(
        "{}|{}|{}|{}|{}|{}|{}",
        candidate.name.trim(),
        text::normalize(&candidate.description),
        candidate.start.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        candidate.end.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        color,
        candidate.category.trim().to_lowercase(),
        candidate.is_focus_time,
    )
}
