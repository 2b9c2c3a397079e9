//! Value codecs
//!
//! Byte transforms applied to values when a memtable is flushed into a
//! compressed segment, and reversed when a segment value is read back.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{Result, StrataError};

/// A reversible byte transform for segment values
pub trait Codec: Send + Sync {
    /// Stable name, recorded in snapshots
    fn name(&self) -> &'static str;

    /// Transform a plain value into its stored form
    fn encode(&self, plain: &[u8]) -> Result<Vec<u8>>;

    /// Recover the plain value from its stored form
    fn decode(&self, stored: &[u8]) -> Result<Vec<u8>>;
}

/// zlib (deflate with zlib framing)
#[derive(Debug, Clone, Copy)]
pub struct ZlibCodec {
    level: Compression,
}

impl ZlibCodec {
    /// zlib at an explicit level (0-9)
    pub fn with_level(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for ZlibCodec {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl Codec for ZlibCodec {
    fn name(&self) -> &'static str {
        "zlib"
    }

    fn encode(&self, plain: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(plain.len() / 2 + 16), self.level);
        encoder
            .write_all(plain)
            .map_err(|e| StrataError::Codec(format!("zlib encode failed: {}", e)))?;
        encoder
            .finish()
            .map_err(|e| StrataError::Codec(format!("zlib encode failed: {}", e)))
    }

    fn decode(&self, stored: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(stored);
        let mut plain = Vec::new();
        decoder
            .read_to_end(&mut plain)
            .map_err(|e| StrataError::Codec(format!("zlib decode failed: {}", e)))?;
        Ok(plain)
    }
}

/// Pass-through codec
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl Codec for IdentityCodec {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn encode(&self, plain: &[u8]) -> Result<Vec<u8>> {
        Ok(plain.to_vec())
    }

    fn decode(&self, stored: &[u8]) -> Result<Vec<u8>> {
        Ok(stored.to_vec())
    }
}
