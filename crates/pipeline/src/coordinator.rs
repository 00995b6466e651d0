//! File coordinator - runs the full pipeline for one input file
//!
//! Wires `LineSource → RecordParser → CacheWriterPool`, joins every stage
//! task and only then decides whether the file may be marked done. The
//! rename happens strictly after the last writer worker has exited.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use appsload_protocol::BinaryCodec;
use appsload_store::ShardMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::{PipelineError, Result};
use crate::metrics::{FileMetrics, FileOutcome, FileReport};
use crate::parser::{ParseOutcome, RecordParser};
use crate::retry::RetryPolicy;
use crate::source::{LineSource, SourceOutcome};
use crate::writer::CacheWriterPool;
use crate::{DEFAULT_MAX_ERROR_RATE, DEFAULT_PROGRESS_INTERVAL, DEFAULT_QUEUE_SIZE, DONE_MARKER};

/// Default writer workers per file
const DEFAULT_WORKERS: usize = 3;

/// Tunables for one file's pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    /// Capacity of the line queue and the record queue
    pub queue_size: usize,

    /// Malformed-line ratio that stops the file
    pub max_error_rate: f64,

    /// Lines between progress log lines (0 disables)
    pub progress_interval: u64,

    /// Writer workers per file
    pub workers: usize,

    /// Write attempts and delay
    pub retry: RetryPolicy,

    /// Log writes instead of sending them
    pub dry_run: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            queue_size: DEFAULT_QUEUE_SIZE,
            max_error_rate: DEFAULT_MAX_ERROR_RATE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            workers: DEFAULT_WORKERS,
            retry: RetryPolicy::default(),
            dry_run: false,
        }
    }
}

/// Runs and finalizes the pipeline for individual files
///
/// Cheap to clone; the shard map and codec are shared read-only by every
/// file processed through the same coordinator.
#[derive(Debug, Clone)]
pub struct FileCoordinator {
    settings: PipelineSettings,
    writers: CacheWriterPool,
    cancel: CancellationToken,
}

impl FileCoordinator {
    /// Create a coordinator
    ///
    /// # Errors
    ///
    /// `PipelineError::NoShards` if the shard map is empty.
    pub fn new(
        settings: PipelineSettings,
        shards: ShardMap,
        codec: Arc<dyn BinaryCodec>,
    ) -> Result<Self> {
        if shards.is_empty() {
            return Err(PipelineError::NoShards);
        }

        let writers = CacheWriterPool::new(
            Arc::new(shards),
            codec,
            settings.workers,
            settings.retry,
            settings.dry_run,
        );

        Ok(Self {
            settings,
            writers,
            cancel: CancellationToken::new(),
        })
    }

    /// Use an external shutdown token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Settings in effect
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Shutdown token observed by the parser
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Process one file end to end
    ///
    /// Returns once every stage task has finished. The file is renamed to
    /// its done form only when it was read to EOF and the parser completed
    /// normally; a tripped gate, a mid-file read error or shutdown leave it
    /// in place for the next run.
    ///
    /// # Errors
    ///
    /// Open and decompression failures, rename failures and panicked stage
    /// tasks. Malformed lines and failed writes are reported through the
    /// returned metrics instead.
    pub async fn process(&self, path: impl AsRef<Path>) -> Result<FileReport> {
        let path = path.as_ref().to_path_buf();
        let started = Instant::now();

        let source = {
            let path = path.clone();
            tokio::task::spawn_blocking(move || LineSource::open(path)).await??
        };

        info!(
            file = %path.display(),
            compressed = source.is_compressed(),
            workers = self.writers.workers(),
            dry_run = self.writers.is_dry_run(),
            "processing file"
        );

        let metrics = Arc::new(FileMetrics::new());
        let queue_size = self.settings.queue_size.max(1);
        let (line_tx, line_rx) = mpsc::channel::<String>(queue_size);
        let (record_tx, record_rx) = crossfire::mpmc::bounded_async(queue_size);

        let progress_interval = self.settings.progress_interval;
        let reader = tokio::task::spawn_blocking(move || source.run(line_tx, progress_interval));

        let workers = self.writers.spawn(&path, record_rx, Arc::clone(&metrics));

        let parser = RecordParser::new(
            &path,
            self.settings.max_error_rate,
            Arc::clone(&metrics),
            self.cancel.clone(),
        );
        let parser = tokio::spawn(parser.run(line_rx, record_tx));

        // Join all stages before inspecting any result.
        let parser_result = parser.await;
        let mut worker_error = None;
        for worker in workers {
            if let Err(e) = worker.await {
                worker_error.get_or_insert(e);
            }
        }
        let reader_result = reader.await;

        let parser_report = parser_result?;
        if let Some(e) = worker_error {
            return Err(e.into());
        }
        let source_report = reader_result?;

        let outcome = match (parser_report.outcome, &source_report.outcome) {
            (ParseOutcome::Cancelled, _) => FileOutcome::Cancelled,
            (ParseOutcome::GateTripped, _) => FileOutcome::ErrorRateExceeded,
            (ParseOutcome::WritersGone, _) => {
                return Err(PipelineError::Task(format!(
                    "writer workers for {} exited before the record stream ended",
                    path.display()
                )));
            }
            (ParseOutcome::Completed, SourceOutcome::Eof) => FileOutcome::Completed,
            (ParseOutcome::Completed, _) => FileOutcome::ReadFailed,
        };

        let marked_as = if outcome == FileOutcome::Completed {
            Some(mark_done(&path).await?)
        } else {
            warn!(
                file = %path.display(),
                outcome = %outcome,
                "file left unmarked for reprocessing"
            );
            None
        };

        let report = FileReport {
            path,
            outcome,
            metrics: metrics.snapshot(),
            marked_as,
        };
        log_report(&report, started.elapsed());

        Ok(report)
    }
}

/// Done form of a file name: the same directory, name prefixed with `.`
pub fn done_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(DONE_MARKER.to_string());
    name.push(path.file_name().unwrap_or_default());
    path.with_file_name(name)
}

/// Whether a file name already carries the done marker
pub fn is_marked_done(path: &Path) -> bool {
    let mut marker = [0u8; 4];
    let marker = DONE_MARKER.encode_utf8(&mut marker).as_bytes();
    path.file_name()
        .is_some_and(|name| name.as_encoded_bytes().starts_with(marker))
}

async fn mark_done(path: &Path) -> Result<PathBuf> {
    let target = done_path(path);
    tokio::fs::rename(path, &target)
        .await
        .map_err(|source| PipelineError::Rename {
            from: path.to_path_buf(),
            to: target.clone(),
            source,
        })?;

    info!(
        file = %path.display(),
        renamed_to = %target.display(),
        "file marked done"
    );
    Ok(target)
}

fn log_report(report: &FileReport, elapsed: Duration) {
    let m = &report.metrics;
    if !m.is_balanced() && report.outcome == FileOutcome::Completed {
        error!(
            file = %report.path.display(),
            lines = m.lines_read,
            parsed = m.parsed,
            malformed = m.malformed,
            settled = m.settled(),
            "record accounting mismatch"
        );
    }

    info!(
        file = %report.path.display(),
        outcome = %report.outcome,
        lines = m.lines_read,
        parsed = m.parsed,
        malformed = m.malformed,
        written = m.written,
        dry_run = m.dry_run,
        unknown_shard = m.unknown_shard,
        failed = m.failed,
        write_attempts = m.write_attempts,
        marked = report.is_marked_done(),
        elapsed_ms = elapsed.as_millis() as u64,
        "file finished"
    );
}
