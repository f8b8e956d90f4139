mod engine;
mod events;
pub mod http;
mod metrics;
mod operation;
pub mod platform;
mod producer;
mod reporter;
mod result;
mod scheduler;
mod simulated;
pub mod strategy;
mod types;
pub mod worker;

pub use engine::SyncEngine;
pub use events::{
    CompositeEventSink, Event, EventSink, NoOpEventSink, StdoutEventSink, TracingEventSink,
};
pub use http::{HttpClient, HttpError, HttpRequestParts, HttpResponseParts, ReqwestHttpClient};
pub use metrics::{MetricsCollector, MetricsEventSink, RunMetrics};
pub use operation::{OperationError, OperationExecutor};
pub use platform::{classify_status, HttpOperationExecutor, StatusClass};
pub use producer::next_batch;
pub use reporter::StatusReporter;
pub use result::{EngineError, RunError};
pub use simulated::SimulatedExecutor;
pub use strategy::PoolSizing;
pub use types::{Ack, EngineConfig, RunReport};
