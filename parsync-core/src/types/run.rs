use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Stopping,
    Stopped,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Stopping => "stopping",
            RunStatus::Stopped => "stopped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Stopped)
    }

    /// Allowed transitions: idle → running, running → stopping | stopped, stopping → stopped.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Idle, RunStatus::Running)
                | (RunStatus::Running, RunStatus::Stopping)
                | (RunStatus::Running, RunStatus::Stopped)
                | (RunStatus::Stopping, RunStatus::Stopped)
        )
    }
}

/// Live, aggregated status of one run. Observers only ever see snapshots of it.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct RunState {
    pub run_id: RunId,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub completed_batches: u64,
    pub failed_batches: u64,
    pub succeeded_items: u64,
    pub failed_items: u64,
    pub dispatched_batches: u64,
    pub queued_batches: u64,
    pub active_workers: u32,
    pub busy_workers: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunState {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            ..Default::default()
        }
    }

    pub fn finished_batches(&self) -> u64 {
        self.completed_batches + self.failed_batches
    }
}
