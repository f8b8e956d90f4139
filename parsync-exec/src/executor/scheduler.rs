use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use parsync_core::{Batch, BatchId, RunId, RunStatus, SyncConfig};
use parsync_source::SourceError;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::executor::reporter::StatusReporter;
use crate::executor::result::RunError;
use crate::executor::strategy::PoolSizing;
use crate::executor::types::RunReport;
use crate::executor::worker::{self, WorkerContext, WorkerId, WorkerReport};
use crate::executor::{Event, EventSink};

struct InFlight {
    batch_id: BatchId,
    item_ids: Vec<String>,
}

struct WorkerSlot {
    inbox: mpsc::Sender<Batch>,
    busy: Option<InFlight>,
}

/// Owns the worker pool and the batch queue for one run.
///
/// Everything that changes pool size or hands out batches happens on this task, so resize
/// decisions are serialized without locks. Workers only talk back through `reports`.
pub struct Scheduler {
    run_id: RunId,
    config: SyncConfig,
    sizing: PoolSizing,
    queue_capacity: usize,
    ctx: Arc<WorkerContext>,
    event_sink: Arc<dyn EventSink>,
    reporter: StatusReporter,

    workers: BTreeMap<WorkerId, WorkerSlot>,
    next_worker_id: WorkerId,
    tasks: JoinSet<WorkerId>,
    queue: VecDeque<Batch>,

    batches: mpsc::Receiver<Result<Batch, SourceError>>,
    producer: JoinHandle<Vec<Batch>>,
    source_done: bool,
    reports_tx: mpsc::Sender<WorkerReport>,
    reports_rx: mpsc::Receiver<WorkerReport>,
    stop: watch::Receiver<bool>,
    stopping: bool,
    cancelled: Vec<String>,
    error: Option<RunError>,
}

pub struct SchedulerParts {
    pub config: SyncConfig,
    pub sizing: PoolSizing,
    pub queue_capacity: usize,
    pub ctx: Arc<WorkerContext>,
    pub reporter: StatusReporter,
    pub batches: mpsc::Receiver<Result<Batch, SourceError>>,
    pub producer: JoinHandle<Vec<Batch>>,
    pub stop: watch::Receiver<bool>,
}

impl Scheduler {
    pub fn new(parts: SchedulerParts) -> Self {
        let (reports_tx, reports_rx) = mpsc::channel(parts.sizing.max_workers.max(1) as usize);
        Self {
            run_id: parts.ctx.run_id,
            config: parts.config,
            sizing: parts.sizing,
            queue_capacity: parts.queue_capacity.max(1),
            event_sink: parts.ctx.event_sink.clone(),
            ctx: parts.ctx,
            reporter: parts.reporter,
            workers: BTreeMap::new(),
            next_worker_id: 1,
            tasks: JoinSet::new(),
            queue: VecDeque::new(),
            batches: parts.batches,
            producer: parts.producer,
            source_done: false,
            reports_tx,
            reports_rx,
            stop: parts.stop,
            stopping: false,
            cancelled: Vec::new(),
            error: None,
        }
    }

    pub async fn run(mut self) -> RunReport {
        tracing::info!(
            run_id = %self.run_id,
            strategy = self.config.strategy.as_str(),
            priority = self.config.priority.as_str(),
            min_workers = self.sizing.min_workers,
            max_workers = self.sizing.max_workers,
            "run started"
        );
        self.event_sink
            .emit(Event::RunStarted {
                run_id: self.run_id,
                strategy: self.config.strategy,
                priority: self.config.priority,
                min_workers: self.sizing.min_workers,
                max_workers: self.sizing.max_workers,
            })
            .await;

        self.tick().await;
        while !self.is_quiescent() {
            let accepting =
                !self.source_done && !self.stopping && self.queue.len() < self.queue_capacity;

            tokio::select! {
                changed = self.stop.changed(), if !self.stopping => {
                    if changed.is_err() {
                        self.begin_stop("engine dropped the run handle").await;
                    } else if *self.stop.borrow() {
                        self.begin_stop("stop requested").await;
                    }
                }
                Some(report) = self.reports_rx.recv() => {
                    self.on_report(report).await;
                }
                msg = self.batches.recv(), if accepting => match msg {
                    Some(Ok(batch)) => self.queue.push_back(batch),
                    Some(Err(e)) => self.fault(RunError::Source(e)).await,
                    None => {
                        tracing::debug!(run_id = %self.run_id, "source exhausted");
                        self.source_done = true;
                    }
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    self.on_worker_exit(joined).await;
                }
            }

            self.tick().await;
        }

        self.shutdown().await
    }

    fn busy_workers(&self) -> u32 {
        self.workers.values().filter(|w| w.busy.is_some()).count() as u32
    }

    fn is_quiescent(&self) -> bool {
        let drained = self.stopping || (self.source_done && self.queue.is_empty());
        drained && self.busy_workers() == 0
    }

    /// Converge the pool toward the strategy's target, then hand queued batches to idle workers.
    async fn tick(&mut self) {
        if !self.stopping && *self.stop.borrow() {
            self.begin_stop("stop requested").await;
        }

        if !self.stopping {
            let active = self.workers.len() as u32;
            let target = self.sizing.target(
                self.config.strategy,
                self.queue.len(),
                active,
                !self.source_done,
            );
            if target != active {
                self.resize(active, target).await;
            }
            self.dispatch().await;
        }

        self.reporter.set_pool(
            self.workers.len() as u32,
            self.busy_workers(),
            self.queue.len() as u64,
        );
    }

    async fn resize(&mut self, from: u32, target: u32) {
        if target > from {
            for _ in from..target {
                self.spawn_worker();
            }
        } else {
            // Only idle workers are retired; busy ones finish their batch first.
            let idle: Vec<WorkerId> = self
                .workers
                .iter()
                .rev()
                .filter(|(_, slot)| slot.busy.is_none())
                .map(|(id, _)| *id)
                .take((from - target) as usize)
                .collect();
            for id in idle {
                self.workers.remove(&id);
            }
        }

        let to = self.workers.len() as u32;
        if to != from {
            tracing::debug!(run_id = %self.run_id, from, to, queue_depth = self.queue.len(), "pool resized");
            self.event_sink
                .emit(Event::PoolResized {
                    run_id: self.run_id,
                    from,
                    to,
                    queue_depth: self.queue.len(),
                })
                .await;
        }
    }

    fn spawn_worker(&mut self) {
        let id = self.next_worker_id;
        self.next_worker_id += 1;
        let (inbox_tx, inbox_rx) = mpsc::channel(1);
        let ctx = self.ctx.clone();
        let reports = self.reports_tx.clone();
        self.tasks.spawn(async move {
            worker::run(id, ctx, inbox_rx, reports).await;
            id
        });
        self.workers.insert(
            id,
            WorkerSlot {
                inbox: inbox_tx,
                busy: None,
            },
        );
    }

    async fn dispatch(&mut self) {
        loop {
            // Emitting below yields, so a stop can land between two dispatches.
            if *self.stop.borrow() {
                self.begin_stop("stop requested").await;
                break;
            }
            let Some(worker_id) = self
                .workers
                .iter()
                .find(|(_, slot)| slot.busy.is_none())
                .map(|(id, _)| *id)
            else {
                break;
            };
            let Some(batch) = self.queue.pop_front() else {
                break;
            };
            let Some(slot) = self.workers.get_mut(&worker_id) else {
                self.queue.push_front(batch);
                break;
            };

            let in_flight = InFlight {
                batch_id: batch.id,
                item_ids: batch.items.iter().map(|item| item.id.clone()).collect(),
            };
            let items = in_flight.item_ids.len();
            match slot.inbox.try_send(batch) {
                Ok(()) => {
                    let batch_id = in_flight.batch_id;
                    slot.busy = Some(in_flight);
                    self.reporter.record_dispatch();
                    tracing::debug!(run_id = %self.run_id, batch_id = %batch_id, worker_id, items, "batch dispatched");
                    self.event_sink
                        .emit(Event::BatchDispatched {
                            run_id: self.run_id,
                            batch_id,
                            worker_id,
                            items,
                        })
                        .await;
                }
                Err(TrySendError::Full(batch)) => {
                    self.queue.push_front(batch);
                    break;
                }
                Err(TrySendError::Closed(batch)) => {
                    tracing::warn!(run_id = %self.run_id, worker_id, "worker inbox closed; removing worker");
                    self.queue.push_front(batch);
                    self.workers.remove(&worker_id);
                }
            }
        }
    }

    async fn on_report(&mut self, report: WorkerReport) {
        if let Some(slot) = self.workers.get_mut(&report.worker_id) {
            slot.busy = None;
        }
        let outcome = report.outcome;
        tracing::debug!(
            run_id = %self.run_id,
            batch_id = %outcome.batch_id,
            worker_id = report.worker_id,
            succeeded = outcome.succeeded_items.len(),
            failed = outcome.failed_items.len(),
            duration_ms = outcome.duration_ms,
            "batch finished"
        );
        self.event_sink
            .emit(Event::BatchFinished {
                run_id: self.run_id,
                batch_id: outcome.batch_id,
                worker_id: report.worker_id,
                succeeded: outcome.succeeded_items.len(),
                failed: outcome.failed_items.len(),
                duration_ms: outcome.duration_ms,
            })
            .await;
        self.reporter.apply(outcome);
    }

    /// A worker task ended. Retired workers exit normally; anything else is a lost worker.
    async fn on_worker_exit(&mut self, joined: Result<WorkerId, tokio::task::JoinError>) {
        let lost: Vec<WorkerId> = match joined {
            Ok(id) if self.workers.contains_key(&id) => vec![id],
            Ok(_) => return,
            // A panicked task drops its inbox receiver, which is how we find it.
            Err(_) => self
                .workers
                .iter()
                .filter(|(_, slot)| slot.inbox.is_closed())
                .map(|(id, _)| *id)
                .collect(),
        };

        for worker_id in lost {
            if let Some(slot) = self.workers.remove(&worker_id) {
                tracing::error!(run_id = %self.run_id, worker_id, "worker exited unexpectedly");
                if let Some(in_flight) = slot.busy {
                    self.cancelled.extend(in_flight.item_ids);
                }
                if self.error.is_none() {
                    self.fault(RunError::WorkerLost { worker_id }).await;
                }
            }
        }
    }

    async fn fault(&mut self, error: RunError) {
        tracing::error!(run_id = %self.run_id, "run fault: {error}");
        self.reporter.set_error(&error);
        let reason = error.to_string();
        self.error = Some(error);
        self.begin_stop(&reason).await;
    }

    async fn begin_stop(&mut self, reason: &str) {
        if self.stopping {
            return;
        }
        self.stopping = true;
        // The producer sees the close and hands back whatever it was holding at shutdown.
        self.batches.close();
        self.reporter.transition(RunStatus::Stopping);
        tracing::info!(run_id = %self.run_id, busy_workers = self.busy_workers(), "stopping: {reason}");
        self.event_sink
            .emit(Event::RunStopping {
                run_id: self.run_id,
                reason: reason.to_string(),
            })
            .await;
    }

    /// Quiescence reached: release the workers, account for undispatched batches, publish the end state.
    async fn shutdown(mut self) -> RunReport {
        self.workers.clear();
        while let Some(joined) = self.tasks.join_next().await {
            if joined.is_err() {
                tracing::warn!(run_id = %self.run_id, "worker panicked during shutdown");
            }
        }

        // Producer first: once it has exited nothing more can land in the channel.
        self.batches.close();
        let unsent = match (&mut self.producer).await {
            Ok(unsent) => unsent,
            Err(e) => {
                tracing::warn!(run_id = %self.run_id, "producer task failed: {e}");
                Vec::new()
            }
        };

        let mut leftover: Vec<Batch> = self.queue.drain(..).collect();
        while let Ok(msg) = self.batches.try_recv() {
            match msg {
                Ok(batch) => leftover.push(batch),
                Err(e) if self.error.is_none() => self.error = Some(RunError::Source(e)),
                Err(e) => tracing::debug!(run_id = %self.run_id, "source error after stop: {e}"),
            }
        }
        leftover.extend(unsent);
        for batch in leftover {
            self.cancelled
                .extend(batch.items.into_iter().map(|item| item.id));
        }

        let report = self.reporter.finish(self.cancelled, self.error);
        tracing::info!(
            run_id = %report.run_id,
            completed_batches = report.state.completed_batches,
            failed_batches = report.state.failed_batches,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            cancelled = report.cancelled.len(),
            "run finished"
        );
        self.event_sink
            .emit(Event::RunFinished {
                run_id: report.run_id,
                status: report.state.status,
                completed_batches: report.state.completed_batches,
                failed_batches: report.state.failed_batches,
                error: report.error.as_ref().map(|e| e.to_string()),
            })
            .await;
        report
    }
}
