//! Configuration for StrataKV
//!
//! Centralized configuration with sensible defaults.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StrataError};

/// Environment variable holding the storage directory
pub const ENV_DB_PATH: &str = "DB_PATH";

/// Environment variable overriding the memtable flush threshold
pub const ENV_THRESHOLD: &str = "STRATAKV_THRESHOLD";

/// Environment variable toggling value compression (`true`/`false`/`1`/`0`)
pub const ENV_COMPRESSION: &str = "STRATAKV_COMPRESSION";

/// Main configuration for a StrataKV engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding one text file per segment.
    /// Persisting stages into a sibling `{db_path}_new` directory first.
    pub db_path: PathBuf,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Number of entries at which the memtable is flushed
    pub threshold: usize,

    // -------------------------------------------------------------------------
    // Codec Configuration
    // -------------------------------------------------------------------------
    /// Pass flushed segment values through the engine's codec
    pub compression: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./stratakv_data"),
            threshold: 100,
            compression: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Build a config from the process environment.
    ///
    /// `DB_PATH` is required; `STRATAKV_THRESHOLD` and `STRATAKV_COMPRESSION`
    /// fall back to the defaults when unset.
    pub fn from_env() -> Result<Self> {
        let db_path = env::var_os(ENV_DB_PATH)
            .map(PathBuf::from)
            .ok_or_else(|| StrataError::Config(format!("{} is not set", ENV_DB_PATH)))?;

        let mut builder = Config::builder().db_path(db_path);

        if let Ok(raw) = env::var(ENV_THRESHOLD) {
            let threshold = raw.trim().parse::<usize>().map_err(|e| {
                StrataError::Config(format!("invalid {} {:?}: {}", ENV_THRESHOLD, raw, e))
            })?;
            builder = builder.threshold(threshold);
        }

        if let Ok(raw) = env::var(ENV_COMPRESSION) {
            builder = builder.compression(parse_flag(ENV_COMPRESSION, &raw)?);
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(StrataError::Config(
                "threshold must be at least 1".to_string(),
            ));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(StrataError::Config("db_path must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(StrataError::Config(format!(
            "invalid {} {:?}: expected a boolean",
            name, raw
        ))),
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the storage directory
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.db_path = path.into();
        self
    }

    /// Set the memtable flush threshold (entry count)
    pub fn threshold(mut self, threshold: usize) -> Self {
        self.config.threshold = threshold;
        self
    }

    /// Enable or disable value compression on flush
    pub fn compression(mut self, enabled: bool) -> Self {
        self.config.compression = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
