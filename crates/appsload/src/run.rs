//! Run a load over every pending input file

use std::sync::Arc;

use anyhow::{Context, Result};
use appsload_config::Config;
use appsload_pipeline::{FileCoordinator, PipelineSettings, RetryPolicy, RunController};
use appsload_protocol::ProtobufCodec;
use appsload_store::ShardMap;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Process every file matching the configured pattern
///
/// Fails when the pattern is invalid or any file could not be processed.
pub async fn run(config: Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        pattern = %config.input.pattern,
        workers = config.writer.workers,
        attempts = config.writer.attempts,
        retry_delay_secs = config.writer.retry_delay_secs,
        dry = config.writer.dry,
        "appsload starting"
    );

    let shards = ShardMap::memcache(config.shards.iter(), config.writer.timeout());
    for (selector, address) in config.shards.iter() {
        info!(shard = selector, address, "shard configured");
    }

    let settings = pipeline_settings(&config);
    let cancel = CancellationToken::new();
    let coordinator = FileCoordinator::new(settings, shards, Arc::new(ProtobufCodec))
        .context("failed to build pipeline")?;
    let controller = RunController::new(coordinator, config.input.pattern.clone())
        .with_file_concurrency(config.input.file_concurrency)
        .with_cancellation(cancel.clone());

    let shutdown = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                _ = wait_for_shutdown() => {
                    info!("shutdown signal received, finishing in-flight files");
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        }
    });

    let result = controller.run().await;
    cancel.cancel();
    let _ = shutdown.await;

    let summary = result.context("run failed")?;
    if summary.has_failures() {
        for path in &summary.failed {
            error!(file = %path.display(), "file failed");
        }
        anyhow::bail!("{} of {} files failed", summary.failed.len(), summary.discovered);
    }

    info!("appsload finished");
    Ok(())
}

fn pipeline_settings(config: &Config) -> PipelineSettings {
    PipelineSettings {
        queue_size: config.input.queue_size,
        max_error_rate: config.input.max_error_rate,
        progress_interval: config.input.progress_interval,
        workers: config.writer.workers,
        retry: RetryPolicy::new(config.writer.attempts, config.writer.retry_delay()),
        dry_run: config.writer.dry,
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
