use crate::types::OperationKind;

pub const MAX_BATCH_SIZE: u32 = 1000;
pub const MIN_TIMEOUT_MS: u64 = 10_000;
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

/// Which operations a run picks up from the item source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Update,
    Delete,
    #[default]
    All,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Create => "create",
            OperationType::Update => "update",
            OperationType::Delete => "delete",
            OperationType::All => "all",
        }
    }

    pub fn matches(&self, kind: OperationKind) -> bool {
        match self {
            OperationType::All => true,
            OperationType::Create => kind == OperationKind::Create,
            OperationType::Update => kind == OperationKind::Update,
            OperationType::Delete => kind == OperationKind::Delete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Speed,
    Cost,
    #[default]
    Balanced,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Speed, Strategy::Cost, Strategy::Balanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Speed => "speed",
            Strategy::Cost => "cost",
            Strategy::Balanced => "balanced",
        }
    }
}

/// Run configuration submitted by the UI. Field names follow the UI's JSON (camelCase).
///
/// A config is frozen once a run starts; changing anything means starting a new run
/// with a freshly validated config.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    pub enabled: bool,
    pub min_workers: u32,
    pub max_workers: u32,
    pub batch_size: u32,
    pub priority: Priority,
    pub operation_type: OperationType,
    pub strategy: Strategy,
    pub retry_attempts: u32,
    pub timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_workers: 2,
            max_workers: 8,
            batch_size: 100,
            priority: Priority::Normal,
            operation_type: OperationType::All,
            strategy: Strategy::Balanced,
            retry_attempts: 3,
            timeout_ms: 300_000,
        }
    }
}

impl SyncConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }

    /// Total attempts an item may receive: the first try plus every retry.
    pub fn max_attempts(&self) -> u32 {
        self.retry_attempts.saturating_add(1)
    }
}
