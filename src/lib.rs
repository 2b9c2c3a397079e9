//! # StrataKV
//!
//! A single-node log-structured-merge key-value store with:
//! - An in-memory memtable flushed at an entry-count threshold
//! - Segments merged into one after every flush (last position wins)
//! - A key index locating the freshest flushed copy of each key
//! - Lazy TTL expiry, applied when a read finds an entry expired
//! - Text persistence of segments through a staged directory swap
//! - Whole-engine snapshots
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                             │
//! │               (single owner, &mut self API)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │ put                     │ get
//!          ▼                         ▼
//!   ┌─────────────┐   flush   ┌─────────────┐    ┌─────────────┐
//!   │  MemTable   │ ────────▶ │  Segments   │ ◀─ │  KeyIndex   │
//!   │  (HashMap)  │           │ (merged→1)  │    │ key → pos   │
//!   └─────────────┘           └──────┬──────┘    └─────────────┘
//!                                    │ persist / load
//!                                    ▼
//!                           ┌─────────────────┐
//!                           │ {db_path}/      │
//!                           │ sstable_<i>.txt │
//!                           └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod entry;
pub mod memtable;
pub mod storage;
mod snapshot;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StrataError, Result};
pub use config::Config;
pub use engine::{Engine, SharedEngine};
pub use storage::{Codec, IdentityCodec, ZlibCodec};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of StrataKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
