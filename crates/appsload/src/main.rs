//! Appsload - load device app-install logs into sharded memcached
//!
//! # Usage
//!
//! ```bash
//! # Defaults: /data/appsinstalled/*.tsv.gz, four local memcached shards
//! appsload
//!
//! # Config file plus overrides
//! appsload --config configs/appsload.toml --workers 8 --dry
//!
//! # Custom shard addresses
//! appsload --pattern '/data/*.tsv.gz' --idfa 10.0.0.1:11211 --gaid 10.0.0.2:11211
//! ```

mod run;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use appsload_config::{Config, LogFormat};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Appsload - load device app-install logs into sharded memcached
#[derive(Parser, Debug)]
#[command(name = "appsload")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (error if specified but not found)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long)]
    log_level: Option<String>,

    /// Glob pattern of input files
    #[arg(long)]
    pattern: Option<String>,

    /// Write attempts per record
    #[arg(long)]
    attempts: Option<u32>,

    /// Seconds between write attempts
    #[arg(long = "retry-delay")]
    retry_delay: Option<u64>,

    /// Writer workers per file
    #[arg(long)]
    workers: Option<usize>,

    /// Memcached socket timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Log records instead of writing them
    #[arg(long)]
    dry: bool,

    /// Memcached address for idfa devices
    #[arg(long)]
    idfa: Option<String>,

    /// Memcached address for gaid devices
    #[arg(long)]
    gaid: Option<String>,

    /// Memcached address for adid devices
    #[arg(long)]
    adid: Option<String>,

    /// Memcached address for dvid devices
    #[arg(long)]
    dvid: Option<String>,

    /// Malformed-line ratio that stops a file
    #[arg(long = "max-error-rate")]
    max_error_rate: Option<f64>,

    /// Files processed at the same time
    #[arg(long = "file-concurrency")]
    file_concurrency: Option<usize>,
}

impl Cli {
    /// Apply command-line values on top of the loaded configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(pattern) = &self.pattern {
            config.input.pattern = pattern.clone();
        }
        if let Some(rate) = self.max_error_rate {
            config.input.max_error_rate = rate;
        }
        if let Some(n) = self.file_concurrency {
            config.input.file_concurrency = n;
        }
        if let Some(attempts) = self.attempts {
            config.writer.attempts = attempts;
        }
        if let Some(delay) = self.retry_delay {
            config.writer.retry_delay_secs = delay;
        }
        if let Some(workers) = self.workers {
            config.writer.workers = workers;
        }
        if let Some(timeout) = self.timeout {
            config.writer.timeout_secs = timeout;
        }
        if self.dry {
            config.writer.dry = true;
        }

        let shards = [
            ("idfa", &self.idfa),
            ("gaid", &self.gaid),
            ("adid", &self.adid),
            ("dvid", &self.dvid),
        ];
        for (selector, address) in shards {
            if let Some(address) = address {
                config.shards.set(selector, address.clone());
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate().context("invalid configuration")?;

    let log_level = resolve_log_level(cli.log_level.as_deref(), &config);
    init_logging(&log_level, config.log.format)?;

    run::run(config).await
}

/// Load the config file if one was given, defaults otherwise
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            Config::from_file(path).context("failed to load configuration")
        }
        None => Ok(Config::default()),
    }
}

/// Resolve log level: CLI flag > config file > default "info"
fn resolve_log_level(cli_level: Option<&str>, config: &Config) -> String {
    match cli_level {
        Some(level) => level.to_string(),
        None => config.log.level.as_str().to_string(),
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    match format {
        LogFormat::Console => tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(true))
            .with(filter)
            .init(),
    }

    Ok(())
}
