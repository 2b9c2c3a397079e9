//! Segment persistence
//!
//! Writes the segment sequence as one text file per segment and reads it
//! back.
//!
//! ## Directory Layout
//! ```text
//! {db_path}/
//!   ├── sstable_0.txt
//!   ├── sstable_1.txt
//!   └── ...
//! {db_path}_new/        (staging, only present while persisting)
//! ```
//!
//! ## Line Format
//! ```text
//! key,value,written_at,ttl\n
//! ```
//! `written_at` and `ttl` are seconds as decimal floats; an absent ttl is
//! written as `None`. Values are written in plain (decoded) form and may
//! contain commas; keys may not.
//!
//! ## Swap
//! All files are written into the staging directory first. Only when
//! every file is on disk is the old directory removed and the staging
//! directory renamed into place. The window between the remove and the
//! rename is not atomic: a crash there leaves only `{db_path}_new`.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::entry::Entry;
use crate::error::{Result, StrataError};

use super::{Codec, Segment};

/// Suffix appended to the storage directory for the staging directory
pub const STAGING_SUFFIX: &str = "_new";

/// Rendering of an absent ttl
pub const NO_TTL: &str = "None";

const FILE_PREFIX: &str = "sstable_";
const FILE_EXTENSION: &str = "txt";

/// Summary of a completed persist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistStats {
    pub segments_written: usize,
    pub entries_written: usize,
}

// =============================================================================
// Paths
// =============================================================================

/// `{db_path}_new`
pub fn staging_path(db_path: &Path) -> PathBuf {
    let mut name = OsString::from(db_path.as_os_str());
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

/// File name for the segment at `position`: "sstable_3.txt"
pub fn segment_file_name(position: usize) -> String {
    format!("{}{}.{}", FILE_PREFIX, position, FILE_EXTENSION)
}

/// Parse the sequence position from a segment file path.
/// "sstable_3.txt" → Some(3)
pub fn parse_segment_position(path: &Path) -> Option<usize> {
    if path.extension()? != FILE_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix(FILE_PREFIX)?.parse().ok()
}

// =============================================================================
// Line Codec
// =============================================================================

/// Check that `key` and `value` fit the line format.
///
/// Keys may not contain commas or line breaks; values must be UTF-8
/// without line breaks. Returns the value as text.
pub fn check_encodable<'a>(key: &str, value: &'a [u8]) -> Result<&'a str> {
    if key.contains([',', '\n', '\r']) {
        return Err(StrataError::Unencodable {
            key: key.to_string(),
            reason: "key contains a comma or line break".to_string(),
        });
    }

    let value = std::str::from_utf8(value).map_err(|e| StrataError::Unencodable {
        key: key.to_string(),
        reason: format!("value is not UTF-8: {}", e),
    })?;
    if value.contains(['\n', '\r']) {
        return Err(StrataError::Unencodable {
            key: key.to_string(),
            reason: "value contains a line break".to_string(),
        });
    }

    Ok(value)
}

/// Render one record as a line (without the trailing newline)
pub fn encode_line(key: &str, value: &[u8], entry: &Entry) -> Result<String> {
    let value = check_encodable(key, value)?;

    let ttl = match entry.ttl {
        Some(ttl) => ttl.to_string(),
        None => NO_TTL.to_string(),
    };

    Ok(format!("{},{},{},{}", key, value, entry.written_at, ttl))
}

/// Parse one line into its key and entry (value in plain form).
///
/// The key runs to the first comma; ttl and written_at are the last two
/// fields; the value is whatever lies between.
pub fn decode_line(line: &str) -> std::result::Result<(String, Entry), String> {
    let (key, rest) = line
        .split_once(',')
        .ok_or_else(|| "expected 4 comma-separated fields".to_string())?;
    let (rest, ttl) = rest
        .rsplit_once(',')
        .ok_or_else(|| "expected 4 comma-separated fields".to_string())?;
    let (value, written_at) = rest
        .rsplit_once(',')
        .ok_or_else(|| "expected 4 comma-separated fields".to_string())?;

    let written_at: f64 = written_at
        .trim()
        .parse()
        .map_err(|e| format!("invalid written_at {:?}: {}", written_at, e))?;
    if !written_at.is_finite() {
        return Err(format!("invalid written_at {:?}", written_at));
    }

    let ttl = match ttl.trim() {
        NO_TTL => None,
        raw => {
            let ttl: f64 = raw
                .parse()
                .map_err(|e| format!("invalid ttl {:?}: {}", raw, e))?;
            if !ttl.is_finite() || ttl < 0.0 {
                return Err(format!("invalid ttl {:?}", raw));
            }
            Some(ttl)
        }
    };

    Ok((
        key.to_string(),
        Entry::with_timestamp(value.as_bytes().to_vec(), written_at, ttl),
    ))
}

// =============================================================================
// Persist
// =============================================================================

/// Write `segments` to `db_path` through the staging directory.
///
/// `codec` is the transform the segment values are currently stored
/// under; values are decoded before being written. If any file fails, the
/// staging directory is discarded and `db_path` is left untouched.
pub fn persist_segments(
    db_path: &Path,
    segments: &[Segment],
    codec: Option<&dyn Codec>,
) -> Result<PersistStats> {
    let staging = staging_path(db_path);

    if staging.exists() {
        warn!(path = %staging.display(), "removing leftover staging directory");
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    let stats = match write_segment_files(&staging, segments, codec) {
        Ok(stats) => stats,
        Err(e) => {
            if let Err(cleanup) = fs::remove_dir_all(&staging) {
                warn!(path = %staging.display(), error = %cleanup, "failed to remove staging directory");
            }
            return Err(e);
        }
    };

    swap_into_place(&staging, db_path)?;

    info!(
        path = %db_path.display(),
        segments = stats.segments_written,
        entries = stats.entries_written,
        "persisted segments"
    );

    Ok(stats)
}

fn write_segment_files(
    dir: &Path,
    segments: &[Segment],
    codec: Option<&dyn Codec>,
) -> Result<PersistStats> {
    let mut stats = PersistStats::default();

    for (position, segment) in segments.iter().enumerate() {
        // Sorted keys keep the files stable and diffable
        let mut keys: Vec<&String> = segment.keys().collect();
        keys.sort();

        let mut body = String::new();
        for key in keys {
            let Some(entry) = segment.get(key) else { continue };
            let line = match codec {
                Some(codec) => encode_line(key, &codec.decode(&entry.value)?, entry)?,
                None => encode_line(key, &entry.value, entry)?,
            };
            body.push_str(&line);
            body.push('\n');
        }

        let path = dir.join(segment_file_name(position));
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(body.as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;

        debug!(path = %path.display(), entries = segment.len(), "wrote segment file");

        stats.segments_written += 1;
        stats.entries_written += segment.len();
    }

    Ok(stats)
}

/// Remove the old directory, then rename the staging directory over it
fn swap_into_place(staging: &Path, db_path: &Path) -> Result<()> {
    if db_path.exists() {
        fs::remove_dir_all(db_path)?;
    }

    fs::rename(staging, db_path).map_err(|source| StrataError::InterruptedPersist {
        path: db_path.to_path_buf(),
        staging: staging.to_path_buf(),
        source,
    })
}

// =============================================================================
// Load
// =============================================================================

/// Read every segment file under `db_path`, ordered by the position in
/// its file name.
///
/// Returns `Ok(None)` if the directory does not exist. Values are passed
/// through `codec.encode` so they come back in stored form.
pub fn load_segments(db_path: &Path, codec: Option<&dyn Codec>) -> Result<Option<Vec<Segment>>> {
    if !db_path.exists() {
        let staging = staging_path(db_path);
        if staging.exists() {
            warn!(
                path = %db_path.display(),
                staging = %staging.display(),
                "storage directory missing but staging directory present; a persist was interrupted"
            );
        }
        return Ok(None);
    }

    let mut files: Vec<(usize, PathBuf)> = Vec::new();
    for dir_entry in fs::read_dir(db_path)? {
        let path = dir_entry?.path();
        if !path.is_file() {
            continue;
        }
        match parse_segment_position(&path) {
            Some(position) => files.push((position, path)),
            None => warn!(path = %path.display(), "skipping non-segment file"),
        }
    }
    files.sort();

    let mut segments = Vec::with_capacity(files.len());
    for (_, path) in &files {
        let segment = read_segment_file(path, codec)?;
        debug!(path = %path.display(), entries = segment.len(), "loaded segment file");
        segments.push(segment);
    }

    info!(path = %db_path.display(), segments = segments.len(), "loaded segments");

    Ok(Some(segments))
}

fn read_segment_file(path: &Path, codec: Option<&dyn Codec>) -> Result<Segment> {
    let reader = BufReader::new(File::open(path)?);
    let mut entries = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.strip_suffix('\r').unwrap_or(&line);
        if line.trim().is_empty() {
            continue;
        }

        let (key, mut entry) = decode_line(line).map_err(|reason| StrataError::MalformedRecord {
            file: path.to_path_buf(),
            line: number + 1,
            reason,
        })?;

        if let Some(codec) = codec {
            entry.value = codec.encode(&entry.value)?;
        }
        entries.push((key, entry));
    }

    Ok(entries.into_iter().collect())
}
