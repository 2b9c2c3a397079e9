//! Engine Module
//!
//! The storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Own the memtable, the segment sequence and the key index
//! - Trigger a flush (and merge) when the memtable reaches its threshold
//! - Resolve reads memtable → index → segment, deleting expired entries
//! - Persist segments to the storage directory and load them back
//! - Save and restore whole-engine snapshots

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::entry::Entry;
use crate::error::{Result, StrataError};
use crate::memtable::MemTable;
use crate::snapshot::{self, SnapshotRef};
use crate::storage::{
    self, Codec, KeyIndex, MergeStats, PersistStats, Segment, ZlibCodec,
};

/// An engine behind one mutex, for callers that share it across threads
pub type SharedEngine = Arc<Mutex<Engine>>;

/// The main storage engine
///
/// ## Concurrency Model
///
/// Single owner, no internal locking. Every operation takes `&mut self`
/// and runs to completion. Callers that need to share an engine wrap the
/// whole thing in one mutex (see [`Engine::into_shared`]).
///
/// ## Compression
///
/// With `compression` enabled, values are encoded by the codec when a
/// memtable is flushed and decoded when read back from a segment.
/// Memtable values are always stored plain.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Value transform applied to flushed segments
    codec: Box<dyn Codec>,

    /// Write buffer for recent writes
    memtable: MemTable,

    /// Flushed segments, oldest position first
    segments: Vec<Segment>,

    /// key → position in `segments`
    index: KeyIndex,
}

impl Engine {
    /// Create an engine using the zlib codec
    ///
    /// Creates the storage directory if needed. Existing segment files
    /// are not read until [`Engine::load`] is called.
    pub fn open(config: Config) -> Result<Self> {
        Self::with_codec(config, Box::new(ZlibCodec::default()))
    }

    /// Create an engine with an injected value codec
    pub fn with_codec(config: Config, codec: Box<dyn Codec>) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.db_path)?;

        debug!(
            path = %config.db_path.display(),
            threshold = config.threshold,
            compression = config.compression,
            codec = codec.name(),
            "engine opened"
        );

        Ok(Self {
            config,
            codec,
            memtable: MemTable::new(),
            segments: Vec::new(),
            index: KeyIndex::new(),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified storage directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().db_path(path).build())
    }

    /// Wrap the engine in a shared mutex
    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    // =========================================================================
    // Reads and Writes
    // =========================================================================

    /// Put a key-value pair, optionally expiring after `ttl`
    ///
    /// Flushes synchronously once the memtable holds `threshold` entries.
    /// Records the segment text format cannot hold are refused with
    /// [`StrataError::Unencodable`] before anything is written.
    pub fn put(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let key = key.into();
        let value = value.into();
        storage::check_encodable(&key, &value)?;

        self.memtable.put(key, Entry::new(value, ttl));

        if self.memtable.should_flush(self.config.threshold) {
            self.flush()?;
        }

        Ok(())
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (most recent writes)
    /// 2. Key index → segment
    ///
    /// An expired entry is removed where it was found and the key is
    /// reported absent.
    pub fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        // Step 1: MemTable shadows everything flushed
        if let Some(entry) = self.memtable.get(key) {
            if entry.is_valid() {
                return Ok(Some(entry.value.clone()));
            }

            // The newest write expired; older flushed copies must not resurface
            debug!(key, "memtable entry expired");
            self.memtable.remove(key);
            self.index.remove(key);
            self.evict_flushed(key, self.segments.len());
            return Ok(None);
        }

        // Step 2: Index → segment
        let position = match self.index.resolve(key) {
            Some((position, _)) => position,
            None => return Ok(None),
        };

        let segment = match self.segments.get(position) {
            Some(segment) => segment,
            None => {
                warn!(key, position, "index points at a missing segment");
                self.index.remove(key);
                return Ok(None);
            }
        };

        let entry = match segment.get(key) {
            Some(entry) => entry,
            None => {
                warn!(key, position, "index points at a segment without the key");
                self.index.remove(key);
                return Ok(None);
            }
        };

        if entry.is_valid() {
            return if self.config.compression {
                self.codec.decode(&entry.value).map(Some)
            } else {
                Ok(Some(entry.value.clone()))
            };
        }

        // Step 3: Lazy delete, including stale copies in older segments
        debug!(key, position, "segment entry expired");
        self.index.remove(key);
        self.evict_flushed(key, position + 1);
        Ok(None)
    }

    /// Remove `key` from every segment before position `end`
    fn evict_flushed(&mut self, key: &str, end: usize) {
        let end = end.min(self.segments.len());
        for segment in &mut self.segments[..end] {
            segment.remove(key);
        }
    }

    // =========================================================================
    // Flush and Merge
    // =========================================================================

    /// Move the memtable into a new segment, index it, then merge.
    ///
    /// Does nothing when the memtable is empty.
    pub fn flush(&mut self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        // Encode before draining so a codec failure loses nothing
        let entries: Segment = if self.config.compression {
            let mut encoded = Vec::with_capacity(self.memtable.len());
            for (key, entry) in self.memtable.iter() {
                let value = self.codec.encode(&entry.value)?;
                encoded.push((
                    key.clone(),
                    Entry::with_timestamp(value, entry.written_at, entry.ttl),
                ));
            }
            self.memtable.clear();
            encoded.into_iter().collect()
        } else {
            Segment::new(self.memtable.drain())
        };

        let position = self.segments.len();
        for key in entries.keys() {
            self.index.register(key.as_str(), position);
        }

        debug!(position, entries = entries.len(), "flushed memtable");
        self.segments.push(entries);

        self.merge();
        Ok(())
    }

    /// Collapse the segment sequence into one segment
    ///
    /// Later segments win for duplicate keys. The index is retargeted at
    /// the surviving segment so every entry stays resolvable.
    pub fn merge(&mut self) -> Option<MergeStats> {
        let stats = storage::merge_segments(&mut self.segments)?;
        self.index.retarget_all(0);
        Some(stats)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Write every segment to the storage directory, then drop them
    ///
    /// Afterwards the engine holds no segments (and an empty index) until
    /// [`Engine::load`] or further flushes. The memtable is untouched.
    pub fn persist(&mut self) -> Result<PersistStats> {
        let codec = self.active_codec();
        let stats = storage::persist_segments(&self.config.db_path, &self.segments, codec)?;

        self.segments.clear();
        self.index.clear();

        Ok(stats)
    }

    /// Replace the in-memory segments with those in the storage directory
    ///
    /// Leaves state untouched when the directory does not exist or any
    /// file fails to parse.
    pub fn load(&mut self) -> Result<()> {
        let codec = self.active_codec();
        let Some(segments) = storage::load_segments(&self.config.db_path, codec)? else {
            debug!(path = %self.config.db_path.display(), "no storage directory to load");
            return Ok(());
        };

        self.segments = segments;
        self.index.rebuild(&self.segments);

        info!(
            segments = self.segments.len(),
            keys = self.index.len(),
            "rebuilt key index"
        );

        Ok(())
    }

    /// Save the whole engine state to a single snapshot file
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let state = SnapshotRef {
            config: &self.config,
            codec: self.codec.name(),
            memtable: &self.memtable,
            segments: &self.segments,
            index: &self.index,
        };
        snapshot::write_snapshot(path.as_ref(), &state)
    }

    /// Restore an engine from a snapshot, using the zlib codec
    pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_snapshot_with_codec(path, Box::new(ZlibCodec::default()))
    }

    /// Restore an engine from a snapshot with an injected codec
    ///
    /// The codec must match the one the snapshot's segments were encoded
    /// with when the snapshot has compression enabled.
    pub fn load_snapshot_with_codec(path: impl AsRef<Path>, codec: Box<dyn Codec>) -> Result<Self> {
        let state = snapshot::read_snapshot(path.as_ref())?;
        state.config.validate()?;

        if state.config.compression && state.codec != codec.name() {
            return Err(StrataError::Snapshot(format!(
                "snapshot was written with codec {:?}, got {:?}",
                state.codec,
                codec.name()
            )));
        }

        Ok(Self {
            config: state.config,
            codec,
            memtable: state.memtable,
            segments: state.segments,
            index: state.index,
        })
    }

    /// Flush, persist, and reset to an empty engine
    ///
    /// Pending memtable writes are flushed first so they reach disk.
    pub fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.persist()?;

        self.memtable.clear();
        self.segments.clear();
        self.index.clear();

        info!(path = %self.config.db_path.display(), "engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the storage directory path
    pub fn db_path(&self) -> &Path {
        &self.config.db_path
    }

    /// Get the staging directory used while persisting
    pub fn staging_path(&self) -> std::path::PathBuf {
        storage::staging_path(&self.config.db_path)
    }

    /// Get the memtable entry count
    pub fn memtable_len(&self) -> usize {
        self.memtable.len()
    }

    /// Get the number of segments
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Get the number of indexed keys
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Whether flushed values pass through the codec
    pub fn is_compressed(&self) -> bool {
        self.config.compression
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the segments, oldest position first
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn active_codec(&self) -> Option<&dyn Codec> {
        if self.config.compression {
            Some(self.codec.as_ref())
        } else {
            None
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("codec", &self.codec.name())
            .field("memtable_len", &self.memtable.len())
            .field("segments", &self.segments.len())
            .field("index_len", &self.index.len())
            .finish()
    }
}
