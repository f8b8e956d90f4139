use async_trait::async_trait;
use parsync_core::{BatchId, Priority, RunId, RunStatus, Strategy};
use serde_json::json;

#[derive(Debug, Clone)]
pub enum Event {
    RunStarted {
        run_id: RunId,
        strategy: Strategy,
        priority: Priority,
        min_workers: u32,
        max_workers: u32,
    },
    PoolResized {
        run_id: RunId,
        from: u32,
        to: u32,
        queue_depth: usize,
    },
    BatchDispatched {
        run_id: RunId,
        batch_id: BatchId,
        worker_id: u32,
        items: usize,
    },
    ItemRetryScheduled {
        run_id: RunId,
        batch_id: BatchId,
        item_id: String,
        attempt: u32,
        delay_ms: u64,
        timed_out: bool,
    },
    ItemFailed {
        run_id: RunId,
        batch_id: BatchId,
        item_id: String,
        attempt: u32,
        error: String,
    },
    BatchFinished {
        run_id: RunId,
        batch_id: BatchId,
        worker_id: u32,
        succeeded: usize,
        failed: usize,
        duration_ms: u64,
    },
    RunStopping {
        run_id: RunId,
        reason: String,
    },
    RunFinished {
        run_id: RunId,
        status: RunStatus,
        completed_batches: u64,
        failed_batches: u64,
        error: Option<String>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::RunStarted { .. } => "run.started",
            Event::PoolResized { .. } => "pool.resized",
            Event::BatchDispatched { .. } => "batch.dispatched",
            Event::ItemRetryScheduled { .. } => "item.retry_scheduled",
            Event::ItemFailed { .. } => "item.failed",
            Event::BatchFinished { .. } => "batch.finished",
            Event::RunStopping { .. } => "run.stopping",
            Event::RunFinished { .. } => "run.finished",
        }
    }

    pub fn run_id(&self) -> RunId {
        match self {
            Event::RunStarted { run_id, .. }
            | Event::PoolResized { run_id, .. }
            | Event::BatchDispatched { run_id, .. }
            | Event::ItemRetryScheduled { run_id, .. }
            | Event::ItemFailed { run_id, .. }
            | Event::BatchFinished { run_id, .. }
            | Event::RunStopping { run_id, .. }
            | Event::RunFinished { run_id, .. } => *run_id,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let body = match self {
            Event::RunStarted {
                strategy,
                priority,
                min_workers,
                max_workers,
                ..
            } => json!({
                "strategy": strategy.as_str(),
                "priority": priority.as_str(),
                "min_workers": min_workers,
                "max_workers": max_workers,
            }),
            Event::PoolResized {
                from,
                to,
                queue_depth,
                ..
            } => json!({ "from": from, "to": to, "queue_depth": queue_depth }),
            Event::BatchDispatched {
                batch_id,
                worker_id,
                items,
                ..
            } => json!({ "batch_id": batch_id.0, "worker_id": worker_id, "items": items }),
            Event::ItemRetryScheduled {
                batch_id,
                item_id,
                attempt,
                delay_ms,
                timed_out,
                ..
            } => json!({
                "batch_id": batch_id.0,
                "item_id": item_id,
                "attempt": attempt,
                "delay_ms": delay_ms,
                "timed_out": timed_out,
            }),
            Event::ItemFailed {
                batch_id,
                item_id,
                attempt,
                error,
                ..
            } => json!({
                "batch_id": batch_id.0,
                "item_id": item_id,
                "attempt": attempt,
                "error": error,
            }),
            Event::BatchFinished {
                batch_id,
                worker_id,
                succeeded,
                failed,
                duration_ms,
                ..
            } => json!({
                "batch_id": batch_id.0,
                "worker_id": worker_id,
                "succeeded": succeeded,
                "failed": failed,
                "duration_ms": duration_ms,
            }),
            Event::RunStopping { reason, .. } => json!({ "reason": reason }),
            Event::RunFinished {
                status,
                completed_batches,
                failed_batches,
                error,
                ..
            } => json!({
                "status": status.as_str(),
                "completed_batches": completed_batches,
                "failed_batches": failed_batches,
                "error": error,
            }),
        };

        let mut value = json!({ "type": self.name(), "run_id": self.run_id().to_string() });
        if let (Some(obj), serde_json::Value::Object(extra)) = (value.as_object_mut(), body) {
            obj.extend(extra);
        }
        value
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

pub struct CompositeEventSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl Default for CompositeEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

/// Writes one JSON object per event to stdout.
pub struct StdoutEventSink;

#[async_trait]
impl EventSink for StdoutEventSink {
    async fn emit(&self, event: Event) {
        println!("{}", serde_json::to_string(&event.to_json()).unwrap_or_default());
    }
}

pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: Event) {
        match &event {
            Event::ItemFailed { item_id, error, .. } => {
                tracing::warn!(run_id = %event.run_id(), item_id = %item_id, "{}: {}", event.name(), error);
            }
            Event::RunFinished { error: Some(error), .. } => {
                tracing::warn!(run_id = %event.run_id(), "{}: {}", event.name(), error);
            }
            _ => {
                tracing::info!(run_id = %event.run_id(), details = %event.to_json(), "{}", event.name());
            }
        }
    }
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: Event) {}
}
