//! Duplicate detection over one run's candidate set.
//!
//! Recurring series legitimately repeat an external id across rows; the
//! unique key (id + start instant) separates those. Rows that still
//! collide after that are true duplicates: only the first-encountered
//! candidate per key is reconciled, the rest are reported and skipped so
//! the destination never receives two copies of the same instant.

use std::collections::HashMap;

use sheetsync_domain::{DuplicateEntry, EventCandidate};
use tracing::warn;

/// Result of splitting a candidate set by unique key.
#[derive(Debug, Default)]
pub struct DuplicatePartition {
    /// First-encountered candidate per unique key, in source row order
    pub primaries: Vec<EventCandidate>,
    /// One entry per key that occurred more than once
    pub duplicates: Vec<DuplicateEntry>,
    /// Candidates dropped as repeat occurrences (counted as skipped)
    pub extra_occurrences: usize,
}

/// Group candidates by unique key, keeping the first occurrence of each.
pub fn partition_duplicates(candidates: Vec<EventCandidate>) -> DuplicatePartition {
    let total = candidates.len();
    let mut counts: HashMap<String, usize> = HashMap::with_capacity(total);
    let mut primaries: Vec<EventCandidate> = Vec::with_capacity(total);

    for candidate in candidates {
        let key = candidate.unique_key();
        match counts.get_mut(&key) {
            Some(count) => *count += 1,
            None => {
                counts.insert(key, 1);
                primaries.push(candidate);
            }
        }
    }

    // Report in source row order by walking the primaries
    let duplicates: Vec<DuplicateEntry> = primaries
        .iter()
        .filter_map(|candidate| {
            let key = candidate.unique_key();
            let occurrences = counts.get(&key).copied().unwrap_or(1);
            (occurrences > 1).then(|| DuplicateEntry {
                unique_key: key,
                external_id: candidate.external_id.clone(),
                event_name: candidate.name.clone(),
                occurrences,
            })
        })
        .collect();

    if !duplicates.is_empty() {
        warn!(keys = duplicates.len(), "found duplicate unique keys in source");
    }

    DuplicatePartition { extra_occurrences: total - primaries.len(), primaries, duplicates }
}
