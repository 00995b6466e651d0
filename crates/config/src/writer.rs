//! Writer configuration
//!
//! Worker pool size and the retry policy for store writes.

use std::time::Duration;

use serde::Deserialize;

/// Cache writer pool settings
///
/// The delay between attempts is constant, there is no backoff.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Concurrent writer workers per file
    /// Default: 3
    pub workers: usize,

    /// Write attempts per record before it is dropped
    /// Default: 3
    pub attempts: u32,

    /// Delay between attempts in seconds
    /// Default: 3
    pub retry_delay_secs: u64,

    /// Socket timeout for each store in seconds
    /// Default: 10
    pub timeout_secs: u64,

    /// Log writes instead of sending them
    /// Default: false
    pub dry: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            attempts: 3,
            retry_delay_secs: 3,
            timeout_secs: 10,
            dry: false,
        }
    }
}

impl WriterConfig {
    /// Get retry delay as Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Get socket timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
