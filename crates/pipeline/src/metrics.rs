//! Per-file pipeline metrics
//!
//! Atomic counters shared by the parser and every writer worker of one file.
//! All operations use relaxed ordering; counters are read once all stage
//! tasks have been joined, so the final snapshot is exact.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one file's pipeline
#[derive(Debug, Default)]
pub struct FileMetrics {
    /// Lines handed to the parser
    lines_read: AtomicU64,

    /// Lines that became records and were forwarded to the writers
    parsed: AtomicU64,

    /// Lines rejected by the parser
    malformed: AtomicU64,

    /// Records stored successfully
    written: AtomicU64,

    /// Records logged instead of written (dry run)
    dry_run: AtomicU64,

    /// Records dropped because no store handles their device type
    unknown_shard: AtomicU64,

    /// Records dropped after exhausting all write attempts
    failed: AtomicU64,

    /// Individual store write attempts
    write_attempts: AtomicU64,
}

impl FileMetrics {
    /// Create new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            lines_read: AtomicU64::new(0),
            parsed: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            written: AtomicU64::new(0),
            dry_run: AtomicU64::new(0),
            unknown_shard: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            write_attempts: AtomicU64::new(0),
        }
    }

    /// Record a line received by the parser
    #[inline]
    pub fn record_line(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a record forwarded to the writers
    #[inline]
    pub fn record_parsed(&self) {
        self.parsed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a malformed line
    #[inline]
    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful store write
    #[inline]
    pub fn record_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dry-run write
    #[inline]
    pub fn record_dry_run(&self) {
        self.dry_run.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a record with no matching shard
    #[inline]
    pub fn record_unknown_shard(&self) {
        self.unknown_shard.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a record dropped after its last attempt failed
    #[inline]
    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one store write attempt
    #[inline]
    pub fn record_write_attempt(&self) {
        self.write_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time copy of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            parsed: self.parsed.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            dry_run: self.dry_run.load(Ordering::Relaxed),
            unknown_shard: self.unknown_shard.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            write_attempts: self.write_attempts.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of file metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub lines_read: u64,
    pub parsed: u64,
    pub malformed: u64,
    pub written: u64,
    pub dry_run: u64,
    pub unknown_shard: u64,
    pub failed: u64,
    pub write_attempts: u64,
}

impl MetricsSnapshot {
    /// Records that reached a final state (stored, logged or dropped)
    #[inline]
    pub fn settled(&self) -> u64 {
        self.written + self.dry_run + self.unknown_shard + self.failed
    }

    /// Every forwarded record settled and every line was classified
    pub fn is_balanced(&self) -> bool {
        self.settled() == self.parsed && self.parsed + self.malformed == self.lines_read
    }

    /// Add another snapshot's counters to this one
    pub fn accumulate(&mut self, other: &MetricsSnapshot) {
        self.lines_read += other.lines_read;
        self.parsed += other.parsed;
        self.malformed += other.malformed;
        self.written += other.written;
        self.dry_run += other.dry_run;
        self.unknown_shard += other.unknown_shard;
        self.failed += other.failed;
        self.write_attempts += other.write_attempts;
    }
}

/// How a file's pipeline ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Whole file read, parsed and written
    Completed,
    /// Error-rate gate stopped forwarding mid-file
    ErrorRateExceeded,
    /// A read error ended the line sequence early
    ReadFailed,
    /// Shutdown was requested while the file was in flight
    Cancelled,
}

impl FileOutcome {
    /// Short name for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::ErrorRateExceeded => "error_rate_exceeded",
            Self::ReadFailed => "read_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final report for one processed file
#[derive(Debug, Clone)]
pub struct FileReport {
    /// File as discovered (before any rename)
    pub path: PathBuf,

    /// How the pipeline ended
    pub outcome: FileOutcome,

    /// Final counters
    pub metrics: MetricsSnapshot,

    /// Where the file now lives if it was marked done
    pub marked_as: Option<PathBuf>,
}

impl FileReport {
    /// Whether the file was renamed to its done form
    #[inline]
    pub fn is_marked_done(&self) -> bool {
        self.marked_as.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let metrics = FileMetrics::new();
        for _ in 0..4 {
            metrics.record_line();
        }
        metrics.record_malformed();
        for _ in 0..3 {
            metrics.record_parsed();
        }
        metrics.record_written();
        metrics.record_unknown_shard();
        metrics.record_failed();
        metrics.record_write_attempt();

        let s = metrics.snapshot();
        assert_eq!(s.lines_read, 4);
        assert_eq!(s.parsed, 3);
        assert_eq!(s.malformed, 1);
        assert_eq!(s.settled(), 3);
        assert!(s.is_balanced());
    }

    #[test]
    fn test_unbalanced_when_records_missing() {
        let s = MetricsSnapshot {
            lines_read: 2,
            parsed: 2,
            written: 1,
            ..Default::default()
        };
        assert!(!s.is_balanced());
    }

    #[test]
    fn test_accumulate() {
        let mut total = MetricsSnapshot::default();
        let one = MetricsSnapshot {
            lines_read: 10,
            parsed: 9,
            malformed: 1,
            written: 9,
            write_attempts: 12,
            ..Default::default()
        };
        total.accumulate(&one);
        total.accumulate(&one);
        assert_eq!(total.lines_read, 20);
        assert_eq!(total.write_attempts, 24);
        assert!(total.is_balanced());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(FileOutcome::ErrorRateExceeded.to_string(), "error_rate_exceeded");
        assert_eq!(FileOutcome::Completed.as_str(), "completed");
    }
}
