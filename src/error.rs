//! Error types for StrataKV
//!
//! Provides a unified error type for all operations. A missing or expired
//! key is not an error: lookups return `Ok(None)`.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using StrataError
pub type Result<T> = std::result::Result<T, StrataError>;

/// Unified error type for StrataKV operations
#[derive(Debug, Error)]
pub enum StrataError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Persistence Errors
    // -------------------------------------------------------------------------
    /// A persisted segment line did not parse into `key,value,written_at,ttl`
    #[error("Malformed record in {}:{line}: {reason}", .file.display())]
    MalformedRecord {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    /// The old storage directory was removed but the staging directory
    /// could not be moved into its place. The data is left at `staging`.
    #[error(
        "Persist interrupted: {} removed but {} could not be renamed into place: {source}",
        .path.display(),
        .staging.display()
    )]
    InterruptedPersist {
        path: PathBuf,
        staging: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A key or value cannot be represented in the text line format
    #[error("Cannot encode key {key:?}: {reason}")]
    Unencodable { key: String, reason: String },

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Codec error: {0}")]
    Codec(String),

    // -------------------------------------------------------------------------
    // Snapshot / Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for StrataError {
    fn from(err: bincode::Error) -> Self {
        StrataError::Serialization(err.to_string())
    }
}
