mod batch;
pub(crate) mod config;
mod item;
mod run;

pub use batch::{Batch, BatchId, BatchOutcome, FailedItem, FatalItemError};
pub use config::{OperationType, Priority, Strategy, SyncConfig};
pub use item::{OperationKind, WorkItem};
pub use run::{RunId, RunState, RunStatus};
