use std::time::Duration;

use async_trait::async_trait;
use parsync_core::WorkItem;

/// Failure of a single attempt against the commerce platform.
///
/// The split is the engine's whole contract with the platform: retryable failures
/// (network trouble, throttling, timeouts) get another attempt while the item's budget
/// lasts, fatal ones (malformed payload, permanent rejection) end the item immediately.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    #[error("retryable: {message}")]
    Retryable {
        message: String,
        retry_after: Option<Duration>,
    },
    #[error("fatal: {message}")]
    Fatal { message: String },
}

impl OperationError {
    pub fn retryable(message: impl Into<String>) -> Self {
        OperationError::Retryable {
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        OperationError::Fatal {
            message: message.into(),
        }
    }

    /// An attempt that overran the run's per-item timeout. Counts as one failed attempt.
    pub fn timeout(after: Duration) -> Self {
        OperationError::retryable(format!("attempt timed out after {}ms", after.as_millis()))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, OperationError::Retryable { .. })
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            OperationError::Retryable { retry_after, .. } => *retry_after,
            OperationError::Fatal { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            OperationError::Retryable { message, .. } | OperationError::Fatal { message } => {
                message
            }
        }
    }
}

#[async_trait]
pub trait OperationExecutor: Send + Sync {
    async fn execute(&self, item: &WorkItem) -> Result<(), OperationError>;
}
