//! Key Index
//!
//! Maps a key to the position of the segment holding its freshest
//! flushed copy. Derived entirely from the segments and never persisted
//! in the text format.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Segment;

/// key → segment position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyIndex {
    positions: HashMap<String, usize>,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `key` at `segment` (overwrite-or-insert)
    pub fn register(&mut self, key: impl Into<String>, segment: usize) {
        self.positions.insert(key.into(), segment);
    }

    /// Find the segment position holding `key`
    pub fn resolve(&self, key: &str) -> Option<(usize, &str)> {
        self.positions
            .get_key_value(key)
            .map(|(k, &pos)| (pos, k.as_str()))
    }

    /// Forget `key`
    pub fn remove(&mut self, key: &str) -> Option<usize> {
        self.positions.remove(key)
    }

    /// Wipe and repopulate from `segments`; later positions win for
    /// duplicate keys.
    pub fn rebuild(&mut self, segments: &[Segment]) {
        self.positions.clear();
        for (position, segment) in segments.iter().enumerate() {
            for key in segment.keys() {
                self.positions.insert(key.clone(), position);
            }
        }
    }

    /// Point every entry at `segment`. Used once compaction has collapsed
    /// the sequence into a single segment.
    pub fn retarget_all(&mut self, segment: usize) {
        for position in self.positions.values_mut() {
            *position = segment;
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }
}
