//! Storage Module
//!
//! Flushed state of the engine: segments, the key index over them,
//! compaction, value codecs and text persistence.
//!
//! ## Responsibilities
//! - Hold immutable snapshots of flushed memtables (segments)
//! - Locate the freshest flushed copy of a key (key index)
//! - Collapse the segment sequence after every flush (compaction)
//! - Write segments to a directory and read them back (persistence)
//!
//! ## Layering
//! ```text
//! ┌───────────┐   flush    ┌────────────────────┐   merge   ┌───────────┐
//! │ MemTable  │ ─────────▶ │ Segment 0..n (Vec) │ ────────▶ │ Segment 0 │
//! └───────────┘            └─────────┬──────────┘           └───────────┘
//!                                    │ register / rebuild
//!                                    ▼
//!                             ┌─────────────┐
//!                             │  KeyIndex   │  key → position
//!                             └─────────────┘
//! ```

mod codec;
mod compaction;
mod index;
mod persist;
mod segment;

pub use codec::{Codec, IdentityCodec, ZlibCodec};
pub use compaction::{merge_segments, MergeStats};
pub use index::KeyIndex;
pub use persist::{
    check_encodable, decode_line, encode_line, load_segments, parse_segment_position, persist_segments,
    segment_file_name, staging_path, PersistStats, NO_TTL, STAGING_SUFFIX,
};
pub use segment::Segment;
