//! Entry definitions
//!
//! A versioned, optionally-expiring value record shared by the memtable
//! and segments.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A single stored value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Value payload (codec-encoded once it lives in a compressed segment)
    pub value: Vec<u8>,

    /// Wall-clock write time, seconds since the unix epoch
    pub written_at: f64,

    /// Time-to-live in seconds; `None` never expires
    pub ttl: Option<f64>,
}

impl Entry {
    /// Create an entry stamped with the current time
    pub fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            value,
            written_at: now_secs(),
            ttl: ttl.map(|d| d.as_secs_f64()),
        }
    }

    /// Create an entry with an explicit write time (used by load paths)
    pub fn with_timestamp(value: Vec<u8>, written_at: f64, ttl: Option<f64>) -> Self {
        Self {
            value,
            written_at,
            ttl,
        }
    }

    /// Whether the entry is still live at `now` (seconds since epoch).
    ///
    /// Valid iff there is no ttl or `now - written_at < ttl`.
    pub fn is_valid_at(&self, now: f64) -> bool {
        match self.ttl {
            None => true,
            Some(ttl) => now - self.written_at < ttl,
        }
    }

    /// Whether the entry is still live right now
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_secs())
    }
}

/// Current wall-clock time in seconds since the unix epoch
pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
