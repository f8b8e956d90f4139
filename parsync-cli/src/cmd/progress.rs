use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parsync_exec::{Event, EventSink};

/// Single-line progress on stderr. The item total is unknown up front, so counts are absolute.
pub struct ProgressEventSink {
    batches_done: AtomicUsize,
    batches_running: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    retries: AtomicUsize,
    workers: AtomicUsize,
}

impl Default for ProgressEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressEventSink {
    pub fn new() -> Self {
        Self {
            batches_done: AtomicUsize::new(0),
            batches_running: AtomicUsize::new(0),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            retries: AtomicUsize::new(0),
            workers: AtomicUsize::new(0),
        }
    }

    fn update_progress(&self) {
        eprint!(
            "\rProgress: batches {} done, {} running | items ✓{} ✗{} | retries {} | workers {}   ",
            self.batches_done.load(Ordering::Relaxed),
            self.batches_running.load(Ordering::Relaxed),
            self.succeeded.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            self.retries.load(Ordering::Relaxed),
            self.workers.load(Ordering::Relaxed),
        );
    }
}

#[async_trait]
impl EventSink for ProgressEventSink {
    async fn emit(&self, event: Event) {
        match event {
            Event::PoolResized { to, .. } => {
                self.workers.store(to as usize, Ordering::Relaxed);
                self.update_progress();
            }
            Event::BatchDispatched { .. } => {
                self.batches_running.fetch_add(1, Ordering::Relaxed);
                self.update_progress();
            }
            Event::BatchFinished {
                succeeded, failed, ..
            } => {
                self.batches_done.fetch_add(1, Ordering::Relaxed);
                self.batches_running
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                        Some(v.saturating_sub(1))
                    })
                    .ok();
                self.succeeded.fetch_add(succeeded, Ordering::Relaxed);
                self.failed.fetch_add(failed, Ordering::Relaxed);
                self.update_progress();
            }
            Event::ItemRetryScheduled { .. } => {
                self.retries.fetch_add(1, Ordering::Relaxed);
                self.update_progress();
            }
            Event::RunStopping { reason, .. } => {
                eprintln!();
                eprintln!("stopping: {reason}");
            }
            Event::RunFinished { .. } => {
                self.workers.store(0, Ordering::Relaxed);
                self.update_progress();
                eprintln!();
            }
            _ => {}
        }
    }
}

pub struct CompositeProgressSink {
    progress: Arc<ProgressEventSink>,
    base: Arc<dyn EventSink>,
}

impl CompositeProgressSink {
    pub fn new(progress: Arc<ProgressEventSink>, base: Arc<dyn EventSink>) -> Self {
        Self { progress, base }
    }
}

#[async_trait]
impl EventSink for CompositeProgressSink {
    async fn emit(&self, event: Event) {
        self.progress.emit(event.clone()).await;
        self.base.emit(event).await;
    }
}
