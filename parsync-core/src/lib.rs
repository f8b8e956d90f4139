#![forbid(unsafe_code)]

pub mod batcher;
pub mod error;
pub mod parser;
pub mod types;
pub mod validate;

pub use crate::batcher::{plan_batches, Batcher};
pub use crate::error::{ConfigError, ParseError};
pub use crate::parser::{parse_config_str, ConfigFormat, ParsedConfig};
pub use crate::types::{
    Batch, BatchId, BatchOutcome, FailedItem, FatalItemError, OperationKind, OperationType,
    Priority, RunId, RunState, RunStatus, Strategy, SyncConfig, WorkItem,
};
pub use crate::validate::{validate_config, validate_fields, Validate};
