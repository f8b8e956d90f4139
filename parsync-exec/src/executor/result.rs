use parsync_core::{ConfigError, RunId};
use parsync_source::SourceError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config rejected: {0}")]
    Config(#[from] ConfigError),
    #[error("run {0} is still active; only one run may execute at a time")]
    RunAlreadyActive(RunId),
    #[error("run not found: {0}")]
    RunNotFound(RunId),
    #[error("run {0} ended without producing a report")]
    RunAborted(RunId),
}

/// Faults that end a whole run, as opposed to failures of individual items.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RunError {
    #[error("item source failed: {0}")]
    Source(#[from] SourceError),
    #[error("worker {worker_id} exited unexpectedly")]
    WorkerLost { worker_id: u32 },
}
