//! Tests for the storage layer: key index and compaction

mod compaction_tests;
