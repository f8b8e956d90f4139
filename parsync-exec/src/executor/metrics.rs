use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parsync_core::{RunId, RunStatus};
use tokio::sync::Mutex;

use crate::executor::{Event, EventSink};

#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    pub run_id: Option<RunId>,
    pub status: String,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
    pub total_duration: Option<Duration>,
    pub batches_dispatched: usize,
    pub batches_completed: usize,
    pub batches_failed: usize,
    pub items_succeeded: usize,
    pub items_failed: usize,
    pub retries: usize,
    pub timeouts: usize,
    pub pool_resizes: usize,
    pub peak_workers: u32,
}

impl RunMetrics {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id: Some(run_id),
            started_at: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record_dispatch(&mut self) {
        self.batches_dispatched += 1;
    }

    pub fn record_batch(&mut self, succeeded: usize, failed: usize) {
        if failed == 0 {
            self.batches_completed += 1;
        } else {
            self.batches_failed += 1;
        }
        self.items_succeeded += succeeded;
        self.items_failed += failed;
    }

    pub fn record_retry(&mut self, timed_out: bool) {
        self.retries += 1;
        if timed_out {
            self.timeouts += 1;
        }
    }

    pub fn record_resize(&mut self, to: u32) {
        self.pool_resizes += 1;
        self.peak_workers = self.peak_workers.max(to);
    }

    pub fn finish(&mut self, status: RunStatus) {
        self.status = status.as_str().to_string();
        self.finished_at = Some(Instant::now());
        if let (Some(started), Some(finished)) = (self.started_at, self.finished_at) {
            self.total_duration = Some(finished.duration_since(started));
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "run_id": self.run_id.map(|id| id.to_string()),
            "status": self.status,
            "duration_ms": self.total_duration.map(|d| d.as_millis() as u64),
            "batches": {
                "dispatched": self.batches_dispatched,
                "completed": self.batches_completed,
                "failed": self.batches_failed,
            },
            "items": {
                "succeeded": self.items_succeeded,
                "failed": self.items_failed,
                "retries": self.retries,
                "timeouts": self.timeouts,
            },
            "pool": {
                "resizes": self.pool_resizes,
                "peak_workers": self.peak_workers,
            },
        })
    }
}

#[derive(Default)]
pub struct MetricsCollector {
    metrics: Arc<Mutex<RunMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_metrics(&self) -> RunMetrics {
        self.metrics.lock().await.clone()
    }

    async fn observe(&self, event: &Event) {
        let mut m = self.metrics.lock().await;
        match event {
            Event::RunStarted { run_id, .. } => *m = RunMetrics::new(*run_id),
            Event::PoolResized { to, .. } => m.record_resize(*to),
            Event::BatchDispatched { .. } => m.record_dispatch(),
            Event::ItemRetryScheduled { timed_out, .. } => m.record_retry(*timed_out),
            Event::BatchFinished {
                succeeded, failed, ..
            } => m.record_batch(*succeeded, *failed),
            Event::RunFinished { status, .. } => m.finish(*status),
            Event::ItemFailed { .. } | Event::RunStopping { .. } => {}
        }
    }
}

/// Updates a [`MetricsCollector`] from the event stream, then forwards to `base`.
pub struct MetricsEventSink {
    collector: Arc<MetricsCollector>,
    base: Arc<dyn EventSink>,
}

impl MetricsEventSink {
    pub fn new(collector: Arc<MetricsCollector>, base: Arc<dyn EventSink>) -> Self {
        Self { collector, base }
    }
}

#[async_trait]
impl EventSink for MetricsEventSink {
    async fn emit(&self, event: Event) {
        self.collector.observe(&event).await;
        self.base.emit(event).await;
    }
}
