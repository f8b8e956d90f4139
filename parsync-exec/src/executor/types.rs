use parsync_core::{FailedItem, RunId, RunState, RunStatus};
use serde_json::json;

use crate::executor::result::RunError;
use crate::retry::RetryConfig;

/// Engine-wide tuning. Per-run behaviour comes from the run's `SyncConfig`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub retry: RetryConfig,
    /// Batches buffered ahead of the workers. Bounds how far the engine reads into the source.
    pub queue_capacity: usize,
    /// Queued batches per worker above which the `cost` strategy adds a worker.
    pub cost_high_water: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            queue_capacity: 32,
            cost_high_water: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub run_id: RunId,
    pub status: RunStatus,
}

/// Final disposition of every item that made it into a batch.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub state: RunState,
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedItem>,
    /// Items that were batched but never dispatched because the run stopped early.
    pub cancelled: Vec<String>,
    pub error: Option<RunError>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.cancelled.is_empty() && self.error.is_none()
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "run_id": self.run_id.to_string(),
            "status": self.state.status.as_str(),
            "started_at": self.state.started_at.map(|t| t.to_rfc3339()),
            "finished_at": self.state.finished_at.map(|t| t.to_rfc3339()),
            "batches": {
                "completed": self.state.completed_batches,
                "failed": self.state.failed_batches,
            },
            "items": {
                "succeeded": self.succeeded.len(),
                "failed": self.failed.len(),
                "cancelled": self.cancelled.len(),
            },
            "failed_items": self.failed.iter().map(|f| json!({
                "id": f.item.id,
                "kind": f.item.kind.as_str(),
                "attempt": f.attempt,
                "error": f.error.to_string(),
            })).collect::<Vec<_>>(),
            "cancelled_items": self.cancelled,
            "error": self.error.as_ref().map(|e| e.to_string()),
        })
    }
}
