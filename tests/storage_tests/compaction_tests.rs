//! Tests for segment compaction
//!
//! These tests verify:
//! - Merging collapses the sequence to one segment
//! - Duplicate keys resolve by sequence position, not timestamp
//! - Fewer than two segments is a no-op

use stratakv::entry::Entry;
use stratakv::storage::{merge_segments, Segment};

fn segment_at(pairs: &[(&str, &str)], written_at: f64) -> Segment {
    pairs
        .iter()
        .map(|(k, v)| {
            (
                k.to_string(),
                Entry::with_timestamp(v.as_bytes().to_vec(), written_at, None),
            )
        })
        .collect()
}

#[test]
fn test_merge_noop_for_zero_or_one_segment() {
    let mut segments: Vec<Segment> = Vec::new();
    assert!(merge_segments(&mut segments).is_none());
    assert!(segments.is_empty());

    let mut segments = vec![segment_at(&[("a", "1")], 1.0)];
    assert!(merge_segments(&mut segments).is_none());
    assert_eq!(segments.len(), 1);
}

#[test]
fn test_merge_later_position_wins() {
    let mut segments = vec![
        segment_at(&[("k", "1"), ("a", "a")], 1.0),
        segment_at(&[("k", "2"), ("b", "b")], 2.0),
    ];

    let stats = merge_segments(&mut segments).unwrap();

    assert_eq!(segments.len(), 1);
    let merged = &segments[0];
    assert_eq!(merged.get("k").unwrap().value, b"2".to_vec());
    assert_eq!(merged.get("a").unwrap().value, b"a".to_vec());
    assert_eq!(merged.get("b").unwrap().value, b"b".to_vec());

    assert_eq!(stats.segments_in, 2);
    assert_eq!(stats.entries_in, 4);
    assert_eq!(stats.entries_out, 3);
    assert_eq!(stats.entries_overridden(), 1);
}

#[test]
fn test_merge_ignores_timestamps() {
    // The later segment holds an older timestamp but still wins
    let mut segments = vec![
        segment_at(&[("k", "newer-by-clock")], 500.0),
        segment_at(&[("k", "later-by-position")], 100.0),
    ];

    merge_segments(&mut segments).unwrap();

    let entry = segments[0].get("k").unwrap();
    assert_eq!(entry.value, b"later-by-position".to_vec());
    assert_eq!(entry.written_at, 100.0);
}

#[test]
fn test_merge_many_segments() {
    let mut segments: Vec<Segment> = (0..5)
        .map(|i| {
            let value = i.to_string();
            let own_key = format!("own{}", i);
            segment_at(&[("shared", value.as_str()), (own_key.as_str(), "x")], i as f64)
        })
        .collect();

    merge_segments(&mut segments).unwrap();

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].len(), 6);
    assert_eq!(segments[0].get("shared").unwrap().value, b"4".to_vec());
}
