//! Tests for segment persistence
//!
//! These tests verify:
//! - Segment files and their line format
//! - persist → load round trips (plain and compressed)
//! - TTL presence survives the text format
//! - Load ordering by file position, not directory order
//! - Malformed records fail the load without touching state
//! - A failed persist leaves the previous directory intact
//! - Expired keys stay absent across persist → load

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use stratakv::storage::{load_segments, persist_segments, staging_path, Segment};
use stratakv::{Codec, Config, Engine, Result, StrataError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_engine(threshold: usize, compression: bool) -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .db_path(temp_dir.path().join("db"))
        .threshold(threshold)
        .compression(compression)
        .build();
    let engine = Engine::open(config).unwrap();
    (temp_dir, engine)
}

/// Pass-through codec that cannot decode the value "poison"
struct PoisonCodec;

impl Codec for PoisonCodec {
    fn name(&self) -> &'static str {
        "poison"
    }

    fn encode(&self, plain: &[u8]) -> Result<Vec<u8>> {
        Ok(plain.to_vec())
    }

    fn decode(&self, stored: &[u8]) -> Result<Vec<u8>> {
        if stored == b"poison" {
            return Err(StrataError::Codec("cannot decode poison".to_string()));
        }
        Ok(stored.to_vec())
    }
}

fn segment_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

// =============================================================================
// File Format Tests
// =============================================================================

#[test]
fn test_persist_writes_one_file_per_segment() {
    let (_temp, mut engine) = setup_engine(100, false);

    engine.put("a", "1", None).unwrap();
    engine.put("b", "2", Some(Duration::from_secs(60))).unwrap();
    engine.flush().unwrap();

    let stats = engine.persist().unwrap();
    assert_eq!(stats.segments_written, 1);
    assert_eq!(stats.entries_written, 2);

    assert_eq!(segment_files(engine.db_path()), vec!["sstable_0.txt"]);

    let body = fs::read_to_string(engine.db_path().join("sstable_0.txt")).unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("a,1,"));
    assert!(lines[0].ends_with(",None"));
    assert!(lines[1].starts_with("b,2,"));
    assert!(lines[1].ends_with(",60"));
}

#[test]
fn test_compressed_segments_persist_plain_text() {
    let (_temp, mut engine) = setup_engine(100, true);

    engine.put("greeting", "hello", None).unwrap();
    engine.flush().unwrap();
    engine.persist().unwrap();

    let body = fs::read_to_string(engine.db_path().join("sstable_0.txt")).unwrap();
    assert!(body.starts_with("greeting,hello,"));
}

#[test]
fn test_persist_clears_segments_and_index() {
    let (_temp, mut engine) = setup_engine(100, false);

    engine.put("flushed", "1", None).unwrap();
    engine.flush().unwrap();
    engine.put("pending", "2", None).unwrap();

    engine.persist().unwrap();

    assert_eq!(engine.segment_count(), 0);
    assert_eq!(engine.index_len(), 0);
    assert_eq!(engine.memtable_len(), 1);
    assert_eq!(engine.get("flushed").unwrap(), None);
    assert_eq!(engine.get("pending").unwrap(), Some(b"2".to_vec()));
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_persist_load_round_trip() {
    for compression in [false, true] {
        let (_temp, mut engine) = setup_engine(100, compression);

        engine.put("a", "1", None).unwrap();
        engine.flush().unwrap();
        engine.persist().unwrap();
        engine.load().unwrap();

        assert_eq!(engine.get("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(engine.segment_count(), 1);
    }
}

#[test]
fn test_round_trip_in_fresh_engine() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .db_path(temp_dir.path().join("db"))
        .threshold(2)
        .build();

    {
        let mut engine = Engine::open(config.clone()).unwrap();
        engine.put("x", "1", None).unwrap();
        engine.put("y", "2", None).unwrap();
        engine.persist().unwrap();
    }

    let mut engine = Engine::open(config).unwrap();
    assert_eq!(engine.get("x").unwrap(), None);

    engine.load().unwrap();
    assert_eq!(engine.get("x").unwrap(), Some(b"1".to_vec()));
    assert_eq!(engine.get("y").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn test_ttl_presence_round_trips() {
    let (_temp, mut engine) = setup_engine(100, false);

    engine.put("forever", "v", None).unwrap();
    engine.put("hour", "v", Some(Duration::from_secs(3600))).unwrap();
    engine.flush().unwrap();
    engine.persist().unwrap();
    engine.load().unwrap();

    let segment = &engine.segments()[0];
    assert_eq!(segment.get("forever").unwrap().ttl, None);
    assert_eq!(segment.get("hour").unwrap().ttl, Some(3600.0));
    assert_eq!(engine.get("hour").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn test_expired_entries_stay_expired_after_reload() {
    let (_temp, mut engine) = setup_engine(100, false);

    engine.put("gone", "v", Some(Duration::ZERO)).unwrap();
    engine.flush().unwrap();
    engine.persist().unwrap();
    engine.load().unwrap();

    assert_eq!(engine.get("gone").unwrap(), None);
}

#[test]
fn test_values_with_commas_round_trip() {
    let (_temp, mut engine) = setup_engine(100, false);

    engine.put("csv", "a,b,c", None).unwrap();
    engine.flush().unwrap();
    engine.persist().unwrap();
    engine.load().unwrap();

    assert_eq!(engine.get("csv").unwrap(), Some(b"a,b,c".to_vec()));
}

// =============================================================================
// Load Tests
// =============================================================================

#[test]
fn test_load_missing_directory_leaves_state() {
    let (_temp, mut engine) = setup_engine(100, false);

    engine.put("a", "1", None).unwrap();
    engine.flush().unwrap();
    fs::remove_dir_all(engine.db_path()).unwrap();

    engine.load().unwrap();

    assert_eq!(engine.segment_count(), 1);
    assert_eq!(engine.get("a").unwrap(), Some(b"1".to_vec()));
}

#[test]
fn test_load_orders_by_file_position() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("db");

    // Lexicographic order would be 0, 10, 2
    write_file(&db, "sstable_0.txt", "k,first,1.0,None\n");
    write_file(&db, "sstable_10.txt", "k,last,1.0,None\n");
    write_file(&db, "sstable_2.txt", "k,middle,1.0,None\nonly2,x,1.0,None\n");

    let segments = load_segments(&db, None).unwrap().unwrap();
    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0].get("k").unwrap().value, b"first".to_vec());
    assert_eq!(segments[1].get("k").unwrap().value, b"middle".to_vec());
    assert_eq!(segments[2].get("k").unwrap().value, b"last".to_vec());

    let config = Config::builder().db_path(&db).compression(false).build();
    let mut engine = Engine::open(config).unwrap();
    engine.load().unwrap();

    assert_eq!(engine.get("k").unwrap(), Some(b"last".to_vec()));
    assert_eq!(engine.get("only2").unwrap(), Some(b"x".to_vec()));
}

#[test]
fn test_load_skips_foreign_files_and_blank_lines() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("db");

    write_file(&db, "sstable_0.txt", "a,1,1.0,None\n\n\r\nb,2,1.0,None\r\n");
    write_file(&db, "README.md", "not a segment");

    let segments = load_segments(&db, None).unwrap().unwrap();

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].len(), 2);
    assert_eq!(segments[0].get("b").unwrap().value, b"2".to_vec());
}

#[test]
fn test_load_malformed_record_fails() {
    let (_temp, mut engine) = setup_engine(100, false);

    engine.put("kept", "1", None).unwrap();
    engine.flush().unwrap();

    write_file(
        engine.db_path(),
        "sstable_0.txt",
        "good,1,1.0,None\nbad-line-without-fields\n",
    );

    let err = engine.load().unwrap_err();
    match err {
        StrataError::MalformedRecord { file, line, .. } => {
            assert!(file.ends_with("sstable_0.txt"));
            assert_eq!(line, 2);
        }
        other => panic!("expected MalformedRecord, got {:?}", other),
    }

    // In-memory state untouched
    assert_eq!(engine.segment_count(), 1);
    assert_eq!(engine.get("kept").unwrap(), Some(b"1".to_vec()));
}

#[test]
fn test_load_rejects_non_numeric_ttl() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("db");
    write_file(&db, "sstable_0.txt", "k,v,1.0,soon\n");

    let result = load_segments(&db, None);
    assert!(matches!(result, Err(StrataError::MalformedRecord { .. })));
}

// =============================================================================
// Swap Safety Tests
// =============================================================================

#[test]
fn test_failed_persist_preserves_previous_directory() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .db_path(temp_dir.path().join("db"))
        .threshold(100)
        .build();
    let mut engine = Engine::with_codec(config, Box::new(PoisonCodec)).unwrap();

    engine.put("safe", "1", None).unwrap();
    engine.flush().unwrap();
    engine.persist().unwrap();

    engine.put("doomed", "poison", None).unwrap();
    engine.flush().unwrap();
    let err = engine.persist().unwrap_err();
    assert!(matches!(err, StrataError::Codec(_)));

    // Previous directory intact, staging removed, segments kept in memory
    let body = fs::read_to_string(engine.db_path().join("sstable_0.txt")).unwrap();
    assert!(body.starts_with("safe,1,"));
    assert!(!engine.staging_path().exists());
    assert_eq!(engine.segment_count(), 1);
    assert_eq!(engine.index_len(), 1);
}

#[test]
fn test_expired_key_stays_gone_across_reload() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("db");

    // Older file holds a live stale copy; newer file holds an expired one
    write_file(&db, "sstable_0.txt", "k,old,1.0,None\nother,x,1.0,None\n");
    write_file(&db, "sstable_1.txt", "k,new,1.0,5\n");

    let config = Config::builder().db_path(&db).compression(false).build();
    let mut engine = Engine::open(config).unwrap();
    engine.load().unwrap();

    assert_eq!(engine.get("k").unwrap(), None);
    assert!(engine.segments().iter().all(|s| !s.contains_key("k")));

    engine.persist().unwrap();
    engine.load().unwrap();
    assert_eq!(engine.get("k").unwrap(), None);
    assert_eq!(engine.get("other").unwrap(), Some(b"x".to_vec()));

    engine.put("fresh", "1", None).unwrap();
    engine.close().unwrap();
    engine.load().unwrap();
    assert_eq!(engine.get("k").unwrap(), None);
    assert_eq!(engine.get("fresh").unwrap(), Some(b"1".to_vec()));
}

#[test]
fn test_expired_memtable_write_evicts_all_flushed_copies() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("db");

    write_file(&db, "sstable_0.txt", "k,oldest,1.0,None\n");
    write_file(&db, "sstable_1.txt", "k,older,1.0,None\n");

    let config = Config::builder().db_path(&db).compression(false).build();
    let mut engine = Engine::open(config).unwrap();
    engine.load().unwrap();

    engine.put("k", "newest", Some(Duration::ZERO)).unwrap();
    assert_eq!(engine.get("k").unwrap(), None);

    engine.persist().unwrap();
    engine.load().unwrap();
    assert_eq!(engine.get("k").unwrap(), None);
}

#[test]
fn test_leftover_staging_directory_is_replaced() {
    let (_temp, mut engine) = setup_engine(100, false);

    write_file(&engine.staging_path(), "sstable_7.txt", "junk,1,1.0,None\n");

    engine.put("a", "1", None).unwrap();
    engine.flush().unwrap();
    engine.persist().unwrap();

    assert_eq!(segment_files(engine.db_path()), vec!["sstable_0.txt"]);
    assert!(!engine.staging_path().exists());
}

#[test]
fn test_persist_empty_sequence_creates_empty_directory() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("db");
    write_file(&db, "sstable_0.txt", "old,1,1.0,None\n");

    let stats = persist_segments(&db, &[] as &[Segment], None).unwrap();

    assert_eq!(stats.segments_written, 0);
    assert!(db.is_dir());
    assert!(segment_files(&db).is_empty());
    assert!(!staging_path(&db).exists());
}
