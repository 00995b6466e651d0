//! Configuration validation
//!
//! Validates config consistency:
//! - Worker, attempt, queue and concurrency counts are at least 1
//! - Error-rate threshold is within (0, 1]
//! - At least one shard is configured and every address is non-empty

use crate::Config;
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_input(config)?;
    validate_writer(config)?;
    validate_shards(config)?;
    Ok(())
}

fn validate_input(config: &Config) -> Result<()> {
    let input = &config.input;

    if input.pattern.trim().is_empty() {
        return Err(ConfigError::invalid_value("input", "pattern", "must not be empty"));
    }

    if !(input.max_error_rate > 0.0 && input.max_error_rate <= 1.0) {
        return Err(ConfigError::invalid_value(
            "input",
            "max_error_rate",
            format!("must be in (0, 1], got {}", input.max_error_rate),
        ));
    }

    if input.file_concurrency == 0 {
        return Err(ConfigError::invalid_value("input", "file_concurrency", "must be at least 1"));
    }

    if input.queue_size == 0 {
        return Err(ConfigError::invalid_value("input", "queue_size", "must be at least 1"));
    }

    Ok(())
}

fn validate_writer(config: &Config) -> Result<()> {
    if config.writer.workers == 0 {
        return Err(ConfigError::invalid_value("writer", "workers", "must be at least 1"));
    }

    if config.writer.attempts == 0 {
        return Err(ConfigError::invalid_value("writer", "attempts", "must be at least 1"));
    }

    Ok(())
}

fn validate_shards(config: &Config) -> Result<()> {
    if config.shards.is_empty() {
        return Err(ConfigError::NoShards);
    }

    for (selector, address) in config.shards.iter() {
        if selector.is_empty() {
            return Err(ConfigError::invalid_value("shards", "selector", "must not be empty"));
        }
        if address.trim().is_empty() {
            return Err(ConfigError::invalid_value("shards", selector, "address must not be empty"));
        }
    }

    Ok(())
}
