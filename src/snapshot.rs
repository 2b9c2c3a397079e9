//! Engine snapshots
//!
//! A whole-engine image in a single file, distinct from the per-segment
//! text files: configuration, memtable, segments and key index travel
//! together.
//!
//! ## File Format
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ Header (18 bytes)                                          │
//! │   Magic: "SKVS" (4) | Version: u16 (2) | CRC32: u32 (4)    │
//! │   PayloadLen: u64 (8)                                      │
//! ├────────────────────────────────────────────────────────────┤
//! │ Payload: bincode(SnapshotState)                            │
//! └────────────────────────────────────────────────────────────┘
//! ```
//! The CRC covers the payload only.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;
use crate::error::{Result, StrataError};
use crate::memtable::MemTable;
use crate::storage::{KeyIndex, Segment};

/// Magic bytes identifying a StrataKV snapshot
pub(crate) const MAGIC: &[u8; 4] = b"SKVS";

/// Current snapshot format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + CRC (4) + PayloadLen (8)
pub(crate) const HEADER_SIZE: usize = 18;

/// Borrowed view of the engine state, for writing
#[derive(Serialize)]
pub(crate) struct SnapshotRef<'a> {
    pub config: &'a Config,
    pub codec: &'a str,
    pub memtable: &'a MemTable,
    pub segments: &'a [Segment],
    pub index: &'a KeyIndex,
}

/// Owned engine state, as read back
#[derive(Deserialize)]
pub(crate) struct SnapshotState {
    pub config: Config,
    pub codec: String,
    pub memtable: MemTable,
    pub segments: Vec<Segment>,
    pub index: KeyIndex,
}

/// Write `state` to `path`, via a temporary sibling file
pub(crate) fn write_snapshot(path: &Path, state: &SnapshotRef<'_>) -> Result<()> {
    let payload = bincode::serialize(state)?;
    let crc = crc32fast::hash(&payload);

    let tmp_path = temp_path(path);
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&crc.to_le_bytes())?;
        writer.write_all(&(payload.len() as u64).to_le_bytes())?;
        writer.write_all(&payload)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    info!(
        path = %path.display(),
        bytes = HEADER_SIZE + payload.len(),
        segments = state.segments.len(),
        memtable_entries = state.memtable.len(),
        "saved snapshot"
    );

    Ok(())
}

/// Read and validate the snapshot at `path`
pub(crate) fn read_snapshot(path: &Path) -> Result<SnapshotState> {
    let bytes = fs::read(path)?;

    if bytes.len() < HEADER_SIZE {
        return Err(StrataError::Snapshot(format!(
            "file too short: {} bytes",
            bytes.len()
        )));
    }

    if &bytes[0..4] != MAGIC {
        return Err(StrataError::Snapshot(format!(
            "invalid magic: expected SKVS, got {:?}",
            &bytes[0..4]
        )));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(StrataError::Snapshot(format!(
            "unsupported version: {}",
            version
        )));
    }

    let crc = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[10..18]);
    let payload_len = u64::from_le_bytes(len_bytes) as usize;

    let payload = &bytes[HEADER_SIZE..];
    if payload.len() != payload_len {
        return Err(StrataError::Snapshot(format!(
            "payload length mismatch: header says {}, found {}",
            payload_len,
            payload.len()
        )));
    }

    let actual = crc32fast::hash(payload);
    if actual != crc {
        return Err(StrataError::Snapshot(format!(
            "checksum mismatch: expected {:08x}, got {:08x}",
            crc, actual
        )));
    }

    let state: SnapshotState = bincode::deserialize(payload)?;

    info!(
        path = %path.display(),
        segments = state.segments.len(),
        memtable_entries = state.memtable.len(),
        "loaded snapshot"
    );

    Ok(state)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
