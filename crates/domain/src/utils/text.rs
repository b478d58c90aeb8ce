//! Description text cleanup.
//!
//! Sheet descriptions arrive with markup pasted from rich-text editors.
//! `strip_html` produces the human-readable form sent to the destination;
//! `normalize` additionally collapses whitespace so that pure formatting
//! edits do not register as content changes.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::MAX_DESCRIPTION_LENGTH;

static BR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Remove markup: `<br>` becomes a newline, remaining tags are dropped and
/// the common entities are decoded.
pub fn strip_html(input: &str) -> String {
    let with_breaks = BR_RE.replace_all(input, "\n");
    let without_tags = TAG_RE.replace_all(&with_breaks, "");
    without_tags
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

/// Markup-free description bounded to the destination's size limit.
pub fn clean_description(input: &str) -> String {
    let cleaned = strip_html(input);
    if cleaned.chars().count() <= MAX_DESCRIPTION_LENGTH {
        return cleaned;
    }
    cleaned.chars().take(MAX_DESCRIPTION_LENGTH).collect()
}

/// Fingerprint form of a description: markup stripped and every whitespace
/// run collapsed to a single space.
pub fn normalize(input: &str) -> String {
    let cleaned = strip_html(input);
    WS_RE.replace_all(&cleaned, " ").trim().to_string()
}
