//! MemTable implementation
//!
//! HashMap-based memtable owned by the engine.

use std::collections::hash_map;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::entry::Entry;

/// In-memory table for recent writes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemTable {
    entries: HashMap<String, Entry>,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `key`.
    ///
    /// Returns the entry count after the write, for the flush trigger.
    pub fn put(&mut self, key: String, entry: Entry) -> usize {
        self.entries.insert(key, entry);
        self.entries.len()
    }

    /// Get the entry for `key`, expired or not
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    /// Remove `key` (used when a read finds it expired)
    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.entries.remove(key)
    }

    /// Get entry count
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the memtable is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if the entry count reached `threshold`
    pub fn should_flush(&self, threshold: usize) -> bool {
        self.entries.len() >= threshold
    }

    /// Take every entry out, leaving a fresh empty memtable behind
    pub fn drain(&mut self) -> HashMap<String, Entry> {
        std::mem::take(&mut self.entries)
    }

    /// Iterate over all entries (unordered)
    pub fn iter(&self) -> hash_map::Iter<'_, String, Entry> {
        self.entries.iter()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
