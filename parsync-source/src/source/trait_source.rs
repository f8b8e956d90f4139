use async_trait::async_trait;
use parsync_core::{OperationType, WorkItem};

/// Provider of pending catalog operations.
///
/// `fetch_pending` opens a lazy, finite, pull-based stream. The operation type is a hint:
/// sources may pre-filter, but the engine filters again, so returning every item is valid.
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn fetch_pending(
        &self,
        operation_type: OperationType,
    ) -> Result<Box<dyn ItemStream>, SourceError>;
}

#[async_trait]
pub trait ItemStream: Send {
    /// Next pending item in source order, or `None` once the source is exhausted.
    async fn next_item(&mut self) -> Result<Option<WorkItem>, SourceError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("item source unavailable: {0}")]
    Unavailable(String),
    #[error("malformed item at {location}: {message}")]
    Malformed { location: String, message: String },
    #[error("item source error: {0}")]
    Other(String),
}

impl From<std::io::Error> for SourceError {
    fn from(e: std::io::Error) -> Self {
        SourceError::Unavailable(e.to_string())
    }
}
