//! MemTable Module
//!
//! In-memory write buffer for recent writes.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Last write for a key wins by overwrite
//! - Track entry count for the flush trigger
//! - Hand its whole contents over to a new segment on flush
//!
//! ## Data Structure Choice
//! A plain `HashMap`: lookups never depend on key order, and the engine
//! owns the memtable exclusively, so no internal locking is needed.

mod table;

pub use table::MemTable;
