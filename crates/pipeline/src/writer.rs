//! Cache writer pool
//!
//! A fixed number of workers share one record queue. Each record is taken
//! by exactly one worker, routed to the store for its device type, encoded
//! and written with bounded retry. Only transient store errors are retried;
//! an invalid key or a refused write drops the record after one attempt.
//! Failures never leave the worker: they are logged, counted and the record
//! is dropped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use appsload_protocol::{BinaryCodec, InstallationRecord};
use appsload_store::{ShardMap, StoreError};
use crossfire::MAsyncRx;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::metrics::FileMetrics;
use crate::retry::{RetryPolicy, execute_with_retry_if};

/// What happened to one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Stored on some attempt
    Written,
    /// Logged only (dry run)
    DryRun,
    /// No store for the device type, dropped without retry
    UnknownShard,
    /// Every attempt failed, dropped
    Failed,
}

/// Pool of writer workers sharing a read-only shard map and codec
#[derive(Clone)]
pub struct CacheWriterPool {
    shards: Arc<ShardMap>,
    codec: Arc<dyn BinaryCodec>,
    workers: usize,
    retry: RetryPolicy,
    dry_run: bool,
}

impl CacheWriterPool {
    /// Create a pool; `workers` is clamped to at least one
    pub fn new(
        shards: Arc<ShardMap>,
        codec: Arc<dyn BinaryCodec>,
        workers: usize,
        retry: RetryPolicy,
        dry_run: bool,
    ) -> Self {
        Self {
            shards,
            codec,
            workers: workers.max(1),
            retry,
            dry_run,
        }
    }

    /// Number of workers spawned per file
    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Whether writes are logged instead of sent
    #[inline]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Spawn the workers for one file
    ///
    /// Each worker runs until the record queue is closed and empty. The
    /// returned handles must all be joined before the file counts as drained.
    pub fn spawn(
        &self,
        file: &Path,
        records: MAsyncRx<InstallationRecord>,
        metrics: Arc<FileMetrics>,
    ) -> Vec<JoinHandle<()>> {
        (0..self.workers)
            .map(|worker_id| {
                let pool = self.clone();
                let file = file.to_path_buf();
                let records = records.clone();
                let metrics = Arc::clone(&metrics);
                tokio::spawn(async move {
                    pool.run_worker(worker_id, file, records, metrics).await;
                })
            })
            .collect()
    }

    async fn run_worker(
        self,
        worker_id: usize,
        file: PathBuf,
        records: MAsyncRx<InstallationRecord>,
        metrics: Arc<FileMetrics>,
    ) {
        let mut handled = 0u64;
        while let Ok(record) = records.recv().await {
            self.write_record(&file, &record, &metrics).await;
            handled += 1;
        }

        debug!(
            file = %file.display(),
            worker = worker_id,
            records = handled,
            "writer worker finished"
        );
    }

    /// Route, encode and write a single record
    pub async fn write_record(
        &self,
        file: &Path,
        record: &InstallationRecord,
        metrics: &FileMetrics,
    ) -> WriteOutcome {
        let Some(store) = self.shards.get(record.shard()) else {
            warn!(
                file = %file.display(),
                shard = %record.device_type,
                device_id = %record.device_id,
                "unknown device type, dropping record"
            );
            metrics.record_unknown_shard();
            return WriteOutcome::UnknownShard;
        };

        let entry = self.codec.entry(record);

        if self.dry_run {
            match self.codec.decode(&entry.value) {
                Ok(preview) => info!(
                    file = %file.display(),
                    key = %entry.key,
                    lat = ?preview.lat,
                    lon = ?preview.lon,
                    apps = ?preview.apps,
                    "dry run, skipping write"
                ),
                Err(e) => info!(
                    file = %file.display(),
                    key = %entry.key,
                    bytes = entry.value.len(),
                    error = %e,
                    "dry run, skipping write (payload preview unavailable)"
                ),
            }
            metrics.record_dry_run();
            return WriteOutcome::DryRun;
        }

        let result = execute_with_retry_if(
            &self.retry,
            &entry.key,
            StoreError::is_transient,
            |_attempt| {
                metrics.record_write_attempt();
                store.put(&entry.key, &entry.value)
            },
        )
        .await;

        match result {
            Ok(()) => {
                metrics.record_written();
                WriteOutcome::Written
            }
            Err(e) => {
                error!(
                    file = %file.display(),
                    shard = %record.device_type,
                    endpoint = %store.endpoint(),
                    key = %entry.key,
                    attempts = e.attempts,
                    error = %e.last_error,
                    transient = e.last_error.is_transient(),
                    "write failed, dropping record"
                );
                metrics.record_failed();
                WriteOutcome::Failed
            }
        }
    }
}

impl std::fmt::Debug for CacheWriterPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheWriterPool")
            .field("shards", &self.shards)
            .field("workers", &self.workers)
            .field("retry", &self.retry)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}
