//! Appsload Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use appsload_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[writer]\nworkers = 8").unwrap();
//! assert_eq!(config.writer.workers, 8);
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! [log]
//! level = "info"
//! format = "console"
//!
//! [input]
//! pattern = "/data/appsinstalled/*.tsv.gz"
//! max_error_rate = 0.01
//! file_concurrency = 4
//!
//! [writer]
//! workers = 3
//! attempts = 3
//! retry_delay_secs = 3
//! timeout_secs = 10
//! dry = false
//!
//! [shards]
//! idfa = "127.0.0.1:33013"
//! gaid = "127.0.0.1:33014"
//! adid = "127.0.0.1:33015"
//! dvid = "127.0.0.1:33016"
//! ```

mod error;
mod input;
mod logging;
mod shards;
mod validation;
mod writer;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use input::InputConfig;
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use shards::{DEFAULT_SHARDS, ShardsConfig};
pub use writer::WriterConfig;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Input discovery and parsing
    pub input: InputConfig,

    /// Cache writer pool and retry policy
    pub writer: WriterConfig,

    /// Shard selector to memcached address
    pub shards: ShardsConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Call again after applying command-line overrides.
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
