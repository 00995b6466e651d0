//! Run controller - discovers input files and processes each one
//!
//! Files whose name starts with the done marker are skipped. The remaining
//! files run through their own pipeline, up to `file_concurrency` at a
//! time. A file that fails is recorded in the summary and never affects
//! any other file.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::coordinator::{FileCoordinator, is_marked_done};
use crate::error::{PipelineError, Result};
use crate::metrics::{FileReport, MetricsSnapshot};

/// Default number of files processed at once
const DEFAULT_FILE_CONCURRENCY: usize = 4;

/// Outcome of a whole run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Files matched by the pattern
    pub discovered: usize,

    /// Files skipped because they already carry the done marker
    pub skipped: usize,

    /// Files whose pipeline ran to the end (marked or not)
    pub processed: usize,

    /// Files renamed to their done form
    pub marked: usize,

    /// Files processed but left in place (gate, read error, shutdown)
    pub unmarked: Vec<PathBuf>,

    /// Files that could not be processed (open, decompression, rename)
    pub failed: Vec<PathBuf>,

    /// Files never started because of shutdown
    pub not_started: usize,

    /// Counters summed over every processed file
    pub totals: MetricsSnapshot,
}

impl RunSummary {
    /// Whether any file failed outright
    #[inline]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    fn record(&mut self, report: &FileReport) {
        self.processed += 1;
        self.totals.accumulate(&report.metrics);
        if report.is_marked_done() {
            self.marked += 1;
        } else {
            self.unmarked.push(report.path.clone());
        }
    }
}

/// List files matching a glob pattern, sorted, directories excluded
///
/// # Errors
///
/// `PipelineError::Pattern` if the pattern is not a valid glob.
pub fn discover_files(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in glob::glob(pattern)? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!(path = %e.path().display(), error = %e, "unreadable path while matching"),
        }
    }
    files.sort();
    Ok(files)
}

/// Drives one run over every file matching a pattern
pub struct RunController {
    coordinator: FileCoordinator,
    pattern: String,
    file_concurrency: usize,
    cancel: CancellationToken,
}

impl RunController {
    /// Create a controller for `pattern`
    pub fn new(coordinator: FileCoordinator, pattern: impl Into<String>) -> Self {
        let cancel = coordinator.cancellation().clone();
        Self {
            coordinator,
            pattern: pattern.into(),
            file_concurrency: DEFAULT_FILE_CONCURRENCY,
            cancel,
        }
    }

    /// Limit the number of files in flight (at least one)
    pub fn with_file_concurrency(mut self, file_concurrency: usize) -> Self {
        self.file_concurrency = file_concurrency.max(1);
        self
    }

    /// Use an external shutdown token for the run and every file
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.coordinator = self.coordinator.with_cancellation(cancel.clone());
        self.cancel = cancel;
        self
    }

    /// Glob pattern of the input files
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Process every pending file and wait for all of them
    ///
    /// # Errors
    ///
    /// Only an invalid pattern fails the run; per-file failures are
    /// collected in the summary.
    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        let files = discover_files(&self.pattern)?;

        let mut summary = RunSummary {
            discovered: files.len(),
            ..RunSummary::default()
        };

        info!(
            pattern = %self.pattern,
            files = files.len(),
            file_concurrency = self.file_concurrency,
            "starting run"
        );

        let semaphore = Arc::new(Semaphore::new(self.file_concurrency));
        let mut tasks = JoinSet::new();
        let mut in_flight = HashMap::new();

        let mut pending = files.into_iter();
        while let Some(path) = pending.next() {
            if is_marked_done(&path) {
                debug!(file = %path.display(), "already processed, skipping");
                summary.skipped += 1;
                continue;
            }

            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    summary.not_started = 1 + pending.by_ref().filter(|p| !is_marked_done(p)).count();
                    info!(not_started = summary.not_started, "shutdown requested, not starting remaining files");
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => {
                    permit.map_err(|e| PipelineError::Task(e.to_string()))?
                }
            };

            let coordinator = self.coordinator.clone();
            let task_path = path.clone();
            let handle = tasks.spawn(async move {
                let _permit = permit;
                coordinator.process(&task_path).await
            });
            in_flight.insert(handle.id(), path);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(e) => (e.id(), Err(PipelineError::from(e))),
            };
            let path = in_flight.remove(&id).unwrap_or_default();

            match result {
                Ok(report) => summary.record(&report),
                Err(e) => {
                    error!(file = %path.display(), error = %e, "file failed");
                    summary.failed.push(path);
                }
            }
        }

        log_summary(&self.pattern, &summary, started);
        Ok(summary)
    }
}

fn log_summary(pattern: &str, summary: &RunSummary, started: Instant) {
    let totals = &summary.totals;
    info!(
        pattern,
        discovered = summary.discovered,
        skipped = summary.skipped,
        processed = summary.processed,
        marked = summary.marked,
        unmarked = summary.unmarked.len(),
        failed = summary.failed.len(),
        not_started = summary.not_started,
        lines = totals.lines_read,
        written = totals.written,
        malformed = totals.malformed,
        write_failures = totals.failed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "run finished"
    );

    for path in &summary.unmarked {
        warn!(file = %path.display(), "file not marked done");
    }
}

impl std::fmt::Debug for RunController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunController")
            .field("pattern", &self.pattern)
            .field("file_concurrency", &self.file_concurrency)
            .finish()
    }
}
