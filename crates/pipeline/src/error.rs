//! Pipeline error types
//!
//! Only file-level and configuration failures surface as errors. Malformed
//! lines, unknown shards and failed writes are counted and logged by the
//! stage that sees them.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input file could not be opened
    #[error("failed to open {}: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Input file looks compressed but the gzip stream is unreadable
    #[error("failed to decompress {}: {source}", path.display())]
    Decompression {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Done-marker rename failed
    #[error("failed to rename {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Input glob pattern is invalid
    #[error("invalid input pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// No store is configured for any device type
    #[error("no shards configured")]
    NoShards,

    /// A pipeline task panicked or was aborted
    #[error("pipeline task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
