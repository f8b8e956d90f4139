use crate::error::ConfigError;
use crate::types::config::{MAX_BATCH_SIZE, MAX_RETRY_ATTEMPTS, MIN_TIMEOUT_MS};
use crate::types::SyncConfig;

// Order matters: the first failing rule is the one reported.
pub(super) fn check(config: &SyncConfig, require_enabled: bool) -> Result<(), ConfigError> {
    worker_range(config)?;
    batch_size(config)?;
    timeout(config)?;
    if require_enabled {
        enabled(config)?;
    }
    worker_floor(config)?;
    retry_attempts(config)
}

fn worker_range(config: &SyncConfig) -> Result<(), ConfigError> {
    if config.min_workers > config.max_workers {
        return Err(ConfigError::WorkerRangeInvalid {
            min: config.min_workers,
            max: config.max_workers,
        });
    }
    Ok(())
}

fn batch_size(config: &SyncConfig) -> Result<(), ConfigError> {
    if !(1..=MAX_BATCH_SIZE).contains(&config.batch_size) {
        return Err(ConfigError::BatchSizeOutOfRange(config.batch_size));
    }
    Ok(())
}

fn timeout(config: &SyncConfig) -> Result<(), ConfigError> {
    if config.timeout_ms < MIN_TIMEOUT_MS {
        return Err(ConfigError::TimeoutTooLow(config.timeout_ms));
    }
    Ok(())
}

fn enabled(config: &SyncConfig) -> Result<(), ConfigError> {
    if !config.enabled {
        return Err(ConfigError::Disabled);
    }
    Ok(())
}

fn worker_floor(config: &SyncConfig) -> Result<(), ConfigError> {
    if config.min_workers == 0 {
        return Err(ConfigError::WorkerCountZero);
    }
    Ok(())
}

fn retry_attempts(config: &SyncConfig) -> Result<(), ConfigError> {
    if config.retry_attempts > MAX_RETRY_ATTEMPTS {
        return Err(ConfigError::RetryAttemptsOutOfRange(config.retry_attempts));
    }
    Ok(())
}
