use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse as JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to parse as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unable to auto-detect config format (neither valid JSON nor valid YAML)")]
    UnknownFormat,
}

/// Rejection reasons for a [`SyncConfig`](crate::SyncConfig), reported before any worker starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("minWorkers ({min}) must not exceed maxWorkers ({max})")]
    WorkerRangeInvalid { min: u32, max: u32 },
    #[error("batchSize ({0}) must be between 1 and 1000")]
    BatchSizeOutOfRange(u32),
    #[error("timeoutMs ({0}) must be at least 10000")]
    TimeoutTooLow(u64),
    #[error("sync is disabled in this config")]
    Disabled,
    #[error("minWorkers must be at least 1")]
    WorkerCountZero,
    #[error("retryAttempts ({0}) must be between 0 and 10")]
    RetryAttemptsOutOfRange(u32),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::WorkerRangeInvalid { .. } => "worker_range_invalid",
            ConfigError::BatchSizeOutOfRange(_) => "batch_size_out_of_range",
            ConfigError::TimeoutTooLow(_) => "timeout_too_low",
            ConfigError::Disabled => "disabled",
            ConfigError::WorkerCountZero => "worker_count_zero",
            ConfigError::RetryAttemptsOutOfRange(_) => "retry_attempts_out_of_range",
        }
    }
}
