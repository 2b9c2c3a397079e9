//! Compaction - collapsing the segment sequence
//!
//! Every merge folds the whole sequence into one segment. Duplicate keys
//! resolve by sequence position: a later segment overrides an earlier
//! one regardless of the entries' write timestamps.

use std::collections::HashMap;

use tracing::debug;

use super::Segment;

/// Statistics for a single merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Segments consumed
    pub segments_in: usize,
    /// Entries read across all input segments
    pub entries_in: usize,
    /// Entries in the surviving segment
    pub entries_out: usize,
}

impl MergeStats {
    /// Entries dropped because a later segment overrode them
    pub fn entries_overridden(&self) -> usize {
        self.entries_in - self.entries_out
    }
}

/// Merge `segments` into one segment in place.
///
/// Leaves the sequence at length 0 or 1. Returns `None` when there was
/// nothing to merge (fewer than two segments).
pub fn merge_segments(segments: &mut Vec<Segment>) -> Option<MergeStats> {
    if segments.len() < 2 {
        return None;
    }

    let segments_in = segments.len();
    let entries_in: usize = segments.iter().map(Segment::len).sum();

    let mut merged = HashMap::with_capacity(entries_in);
    for segment in segments.drain(..) {
        for (key, entry) in segment.into_entries() {
            merged.insert(key, entry);
        }
    }

    let stats = MergeStats {
        segments_in,
        entries_in,
        entries_out: merged.len(),
    };
    segments.push(Segment::new(merged));

    debug!(
        segments_in = stats.segments_in,
        entries_in = stats.entries_in,
        entries_out = stats.entries_out,
        "merged segments"
    );

    Some(stats)
}
