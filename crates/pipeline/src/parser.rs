//! Record parser stage with the per-file error-rate gate
//!
//! Consumes raw lines, forwards valid records to the writer queue and counts
//! malformed lines. Once the malformed ratio reaches the threshold (and at
//! least one line parsed) the parser stops and drops both of its channel
//! ends: workers see the record queue close, the reader sees its receiver
//! gone.

use std::path::PathBuf;
use std::sync::Arc;

use appsload_protocol::{InstallationRecord, parse_line};
use crossfire::MAsyncTx;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::metrics::FileMetrics;

/// Per-file malformed-line circuit breaker
///
/// Trips when `failures / (successes + failures) >= threshold` and
/// `successes > 0`. A file with no valid line at all never trips it.
#[derive(Debug, Clone)]
pub struct ErrorRateGate {
    threshold: f64,
    successes: u64,
    failures: u64,
}

impl ErrorRateGate {
    /// Create a gate with the given malformed-ratio threshold
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            successes: 0,
            failures: 0,
        }
    }

    /// Count a parsed line
    #[inline]
    pub fn record_success(&mut self) {
        self.successes += 1;
    }

    /// Count a malformed line
    #[inline]
    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    /// Lines classified so far
    #[inline]
    pub fn total(&self) -> u64 {
        self.successes + self.failures
    }

    /// Parsed lines so far
    #[inline]
    pub fn successes(&self) -> u64 {
        self.successes
    }

    /// Malformed lines so far
    #[inline]
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Current malformed ratio (0.0 before any line)
    pub fn error_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.failures as f64 / total as f64,
        }
    }

    /// Whether forwarding must stop
    pub fn is_tripped(&self) -> bool {
        self.successes > 0 && self.error_rate() >= self.threshold
    }
}

/// How the parser stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Line stream ended normally
    Completed,
    /// Error-rate gate tripped
    GateTripped,
    /// Shutdown requested
    Cancelled,
    /// Every writer worker exited before the stream ended
    WritersGone,
}

/// Summary returned when the parser stops
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParserReport {
    /// Records forwarded to the writers
    pub parsed: u64,

    /// Lines rejected
    pub malformed: u64,

    /// Why the parser stopped
    pub outcome: ParseOutcome,
}

/// Parser stage for one file
pub struct RecordParser {
    file: PathBuf,
    gate: ErrorRateGate,
    metrics: Arc<FileMetrics>,
    cancel: CancellationToken,
}

impl RecordParser {
    /// Create a parser for `file` with the given gate threshold
    pub fn new(
        file: impl Into<PathBuf>,
        max_error_rate: f64,
        metrics: Arc<FileMetrics>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            file: file.into(),
            gate: ErrorRateGate::new(max_error_rate),
            metrics,
            cancel,
        }
    }

    /// Run until the line stream ends, the gate trips, or shutdown
    ///
    /// Consumes both channel ends; they are dropped on return, which closes
    /// the record queue for the writer workers.
    pub async fn run(
        mut self,
        mut lines: mpsc::Receiver<String>,
        records: MAsyncTx<InstallationRecord>,
    ) -> ParserReport {
        let outcome = loop {
            let line = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break ParseOutcome::Cancelled,
                line = lines.recv() => match line {
                    Some(line) => line,
                    None => break ParseOutcome::Completed,
                },
            };
            self.metrics.record_line();

            match parse_line(&line) {
                Ok(record) => {
                    if records.send(record).await.is_err() {
                        warn!(file = %self.file.display(), "all writers exited, stopping parser");
                        break ParseOutcome::WritersGone;
                    }
                    self.gate.record_success();
                    self.metrics.record_parsed();
                }
                Err(e) => {
                    warn!(
                        file = %self.file.display(),
                        check = e.kind(),
                        error = %e,
                        "malformed line"
                    );
                    self.gate.record_failure();
                    self.metrics.record_malformed();
                }
            }

            if self.gate.is_tripped() {
                warn!(
                    file = %self.file.display(),
                    total = self.gate.total(),
                    errors = self.gate.failures(),
                    error_rate = self.gate.error_rate(),
                    "too many invalid records, stopping file"
                );
                break ParseOutcome::GateTripped;
            }
        };

        drop(records);
        drop(lines);

        info!(
            file = %self.file.display(),
            parsed = self.gate.successes(),
            malformed = self.gate.failures(),
            outcome = ?outcome,
            "parser finished"
        );

        ParserReport {
            parsed: self.gate.successes(),
            malformed: self.gate.failures(),
            outcome,
        }
    }
}
