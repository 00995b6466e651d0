//! `[log]` section
//!
//! Picks the verbosity and encoding of the run log. What each level shows:
//!
//! | level | adds |
//! |-------|------|
//! | `error` | records dropped after their last write attempt, failed files |
//! | `warn` | malformed lines, unknown device types, gate trips, unmarked files |
//! | `info` | file start/finish, done renames, read progress, dry-run records |
//! | `debug` | every failed write attempt, connections, worker exits |
//! | `trace` | everything the dependencies emit |
//!
//! The binary's `--log-level` flag wins over this section and also accepts
//! full filter directives such as `info,appsload_pipeline=debug`.

use serde::Deserialize;

/// Verbosity of the run log
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Encoding of log lines
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One human-readable line per event, for terminals
    #[default]
    Console,
    /// One JSON object per event, for log shippers; the structured fields
    /// (`file`, `shard`, `attempts`, ...) become JSON keys
    Json,
}

/// `[log]` settings; both keys are optional
///
/// ```toml
/// [log]
/// level = "warn"
/// format = "json"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}
