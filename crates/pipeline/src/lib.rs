//! Appsload - Pipeline
//!
//! Per-file ingestion pipeline connecting a compressed log file to the
//! sharded key-value stores.
//!
//! # Architecture
//!
//! ```text
//!                    mpsc               crossfire mpmc
//! [LineSource] ──→ String ──→ [RecordParser] ──→ InstallationRecord ──┬──→ [Worker 0] ──→ ShardMap
//!  blocking task              error-rate gate                         ├──→ [Worker 1] ──→ ShardMap
//!  gzip / plain                                                       └──→ [Worker N] ──→ ShardMap
//! ```
//!
//! # Key Design
//!
//! - **Bounded hand-off**: stage queues default to capacity 1, so a slow
//!   writer pool throttles the parser and the reader
//! - **Close propagates both ways**: the parser drops its record sender when
//!   the gate trips, which ends every worker's `recv` loop; dropping the line
//!   receiver stops the reader
//! - **Drain before mark**: the coordinator joins every worker before it
//!   renames the file to its done form
//! - **Constant retry delay**: failed writes are retried a fixed number of
//!   times with the same delay between attempts
//!
//! # Example
//!
//! ```ignore
//! use appsload_pipeline::{FileCoordinator, PipelineSettings, RunController};
//! use appsload_protocol::ProtobufCodec;
//! use appsload_store::ShardMap;
//! use std::sync::Arc;
//!
//! let coordinator = FileCoordinator::new(
//!     PipelineSettings::default(),
//!     ShardMap::memcache([("idfa", "127.0.0.1:33013")], timeout),
//!     Arc::new(ProtobufCodec),
//! )?;
//!
//! let summary = RunController::new(coordinator, "/data/*.tsv.gz").run().await?;
//! ```

mod controller;
mod coordinator;
mod error;
mod metrics;
mod parser;
mod retry;
mod source;
mod writer;

pub use controller::{RunController, RunSummary, discover_files};
pub use coordinator::{FileCoordinator, PipelineSettings, done_path, is_marked_done};
pub use error::{PipelineError, Result};
pub use metrics::{FileMetrics, FileOutcome, FileReport, MetricsSnapshot};
pub use parser::{ErrorRateGate, ParseOutcome, ParserReport, RecordParser};
pub use retry::{RetryExhausted, RetryPolicy, execute_with_retry, execute_with_retry_if};
pub use source::{LineSource, SourceOutcome, SourceReport};
pub use writer::{CacheWriterPool, WriteOutcome};

/// Prefix marking a file as fully processed
pub const DONE_MARKER: char = '.';

/// Default capacity of the queues between stages
pub const DEFAULT_QUEUE_SIZE: usize = 1;

/// Default malformed-line ratio that stops a file
pub const DEFAULT_MAX_ERROR_RATE: f64 = 0.01;

/// Default number of lines between progress log lines
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1000;

#[cfg(test)]
mod test_util;

#[cfg(test)]
mod coordinator_test;
