use crate::types::WorkItem;

/// Sequence number of a batch within its run, assigned in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub u64);

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "batch-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub id: BatchId,
    pub items: Vec<WorkItem>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FatalItemError {
    /// The platform refused the operation outright (malformed payload, permanent rejection).
    #[error("rejected: {message}")]
    Rejected { message: String },
    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// An item that ended its run in failure, with the attempt number of its final try.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FailedItem {
    pub item: WorkItem,
    pub error: FatalItemError,
    pub attempt: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub batch_id: BatchId,
    pub succeeded_items: Vec<WorkItem>,
    pub failed_items: Vec<FailedItem>,
    pub duration_ms: u64,
}

impl BatchOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed_items.is_empty()
    }
}
