//! Input configuration
//!
//! Which files to process and how strictly to parse them.

use serde::Deserialize;

/// Input discovery and parsing settings
///
/// # Example
///
/// ```toml
/// [input]
/// pattern = "/data/appsinstalled/*.tsv.gz"
/// max_error_rate = 0.01
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Glob of files to process
    /// Default: "/data/appsinstalled/*.tsv.gz"
    pub pattern: String,

    /// Malformed-line ratio at which a file stops being forwarded
    /// Default: 0.01
    pub max_error_rate: f64,

    /// Files processed at the same time
    /// Default: 4
    pub file_concurrency: usize,

    /// Capacity of the queues between pipeline stages
    /// Default: 1 (hand-off backpressure)
    pub queue_size: usize,

    /// Log a progress line every N lines read (0 disables)
    /// Default: 1000
    pub progress_interval: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            pattern: "/data/appsinstalled/*.tsv.gz".into(),
            max_error_rate: 0.01,
            file_concurrency: 4,
            queue_size: 1,
            progress_interval: 1000,
        }
    }
}
