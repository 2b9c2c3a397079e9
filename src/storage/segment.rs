//! Segment implementation
//!
//! An immutable snapshot of flushed entries. The only mutation allowed
//! after creation is removing an entry a read found expired.

use std::collections::hash_map;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entry::Entry;

/// A flushed, immutable key → entry map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    entries: HashMap<String, Entry>,
}

impl Segment {
    /// Create a segment that takes ownership of `entries`
    pub fn new(entries: HashMap<String, Entry>) -> Self {
        Self { entries }
    }

    /// Get the entry stored for `key`
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Lazy-delete path: drop an entry a read found expired
    pub(crate) fn remove(&mut self, key: &str) -> Option<Entry> {
        self.entries.remove(key)
    }

    /// Whether the segment holds `key`
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all keys
    pub fn keys(&self) -> hash_map::Keys<'_, String, Entry> {
        self.entries.keys()
    }

    /// Iterate over all entries (unordered)
    pub fn iter(&self) -> hash_map::Iter<'_, String, Entry> {
        self.entries.iter()
    }

    /// Consume the segment, yielding its entries
    pub fn into_entries(self) -> HashMap<String, Entry> {
        self.entries
    }
}

impl FromIterator<(String, Entry)> for Segment {
    fn from_iter<I: IntoIterator<Item = (String, Entry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
