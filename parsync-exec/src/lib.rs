#![forbid(unsafe_code)]

//! Runtime engine for parallel catalog synchronization.
//!
//! Config admission and batching live in `parsync-core`, item sources in `parsync-source`.
//! This crate runs the worker pool: a scheduler task owns the pool and the batch queue,
//! workers execute batches against the platform, and a status reporter publishes
//! `RunState` snapshots to observers.

pub mod executor;
pub mod retry;

pub use crate::executor::{
    Ack, EngineConfig, EngineError, Event, EventSink, OperationError, OperationExecutor,
    RunError, RunReport, SyncEngine,
};
