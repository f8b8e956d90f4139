#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

/// One pending catalog operation destined for the commerce platform.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WorkItem {
    pub id: String,
    pub kind: OperationKind,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl WorkItem {
    pub fn new(id: impl Into<String>, kind: OperationKind, payload: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            kind,
            payload,
        }
    }
}
