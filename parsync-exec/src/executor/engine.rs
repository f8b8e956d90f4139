use std::collections::HashMap;
use std::sync::Arc;

use futures_util::stream::{self, Stream};
use parsync_core::{validate_config, RunId, RunState, RunStatus, SyncConfig};
use parsync_source::ItemSource;
use tokio::sync::{mpsc, watch, Mutex};

use crate::executor::operation::OperationExecutor;
use crate::executor::producer;
use crate::executor::reporter::StatusReporter;
use crate::executor::result::EngineError;
use crate::executor::scheduler::{Scheduler, SchedulerParts};
use crate::executor::strategy::PoolSizing;
use crate::executor::types::{Ack, EngineConfig, RunReport};
use crate::executor::worker::WorkerContext;
use crate::executor::EventSink;

struct RunHandle {
    status: watch::Receiver<RunState>,
    stop: watch::Sender<bool>,
    report: watch::Receiver<Option<RunReport>>,
}

impl RunHandle {
    /// Still executing. A run whose scheduler task vanished is not active, whatever its last status.
    fn is_active(&self) -> bool {
        !self.status.borrow().status.is_terminal() && self.report.has_changed().is_ok()
    }
}

/// Entry point for callers: start, stop and observe synchronization runs.
///
/// One run executes at a time. Finished runs stay queryable for the engine's lifetime.
pub struct SyncEngine {
    config: EngineConfig,
    executor: Arc<dyn OperationExecutor>,
    event_sink: Arc<dyn EventSink>,
    runs: Mutex<HashMap<RunId, RunHandle>>,
}

impl SyncEngine {
    pub fn new(
        config: EngineConfig,
        executor: Arc<dyn OperationExecutor>,
        event_sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            executor,
            event_sink,
            runs: Mutex::new(HashMap::new()),
        }
    }

    /// Validates `config` and, if accepted, starts a run over the items `source` yields.
    ///
    /// Nothing is spawned when the config is rejected. The returned run is already `running`.
    pub async fn start_sync(
        &self,
        config: SyncConfig,
        source: Arc<dyn ItemSource>,
    ) -> Result<RunId, EngineError> {
        let config = validate_config(config)?;

        let mut runs = self.runs.lock().await;
        if let Some(active) = runs
            .iter()
            .find(|(_, handle)| handle.is_active())
            .map(|(id, _)| *id)
        {
            return Err(EngineError::RunAlreadyActive(active));
        }

        let run_id = RunId::new();
        let (reporter, status_rx) = StatusReporter::new(run_id);
        reporter.transition(RunStatus::Running);

        let (stop_tx, stop_rx) = watch::channel(false);
        let (report_tx, report_rx) = watch::channel(None);
        let (batches_tx, batches_rx) = mpsc::channel(self.config.queue_capacity.max(1));

        let ctx = Arc::new(WorkerContext {
            run_id,
            executor: self.executor.clone(),
            retry: self.config.retry.clone(),
            timeout: config.timeout(),
            max_attempts: config.max_attempts(),
            event_sink: self.event_sink.clone(),
        });

        let producer = tokio::spawn(producer::produce(run_id, config.clone(), source, batches_tx));

        let scheduler = Scheduler::new(SchedulerParts {
            sizing: PoolSizing::new(&config, self.config.cost_high_water),
            config,
            queue_capacity: self.config.queue_capacity,
            ctx,
            reporter,
            batches: batches_rx,
            producer,
            stop: stop_rx,
        });
        tokio::spawn(async move {
            let report = scheduler.run().await;
            let _ = report_tx.send(Some(report));
        });

        runs.insert(
            run_id,
            RunHandle {
                status: status_rx,
                stop: stop_tx,
                report: report_rx,
            },
        );
        Ok(run_id)
    }

    /// Asks a run to stop. In-flight batches finish; nothing new is dispatched after this returns.
    pub async fn stop_sync(&self, run_id: RunId) -> Result<Ack, EngineError> {
        let runs = self.runs.lock().await;
        let handle = runs.get(&run_id).ok_or(EngineError::RunNotFound(run_id))?;

        let current = handle.status.borrow().status;
        if current.is_terminal() {
            return Ok(Ack {
                run_id,
                status: current,
            });
        }

        handle.stop.send_replace(true);
        tracing::info!(run_id = %run_id, "stop requested");
        Ok(Ack {
            run_id,
            status: RunStatus::Stopping,
        })
    }

    pub async fn get_status(&self, run_id: RunId) -> Result<RunState, EngineError> {
        let runs = self.runs.lock().await;
        let handle = runs.get(&run_id).ok_or(EngineError::RunNotFound(run_id))?;
        let snapshot = handle.status.borrow().clone();
        Ok(snapshot)
    }

    pub async fn subscribe(&self, run_id: RunId) -> Result<watch::Receiver<RunState>, EngineError> {
        let runs = self.runs.lock().await;
        runs.get(&run_id)
            .map(|handle| handle.status.clone())
            .ok_or(EngineError::RunNotFound(run_id))
    }

    /// Snapshots of the run as it changes: the current one first, ending with the `stopped` one.
    ///
    /// Intermediate snapshots may be coalesced when the consumer is slower than the run.
    pub async fn status_stream(
        &self,
        run_id: RunId,
    ) -> Result<impl Stream<Item = RunState> + Send + 'static, EngineError> {
        let rx = self.subscribe(run_id).await?;
        Ok(stream::unfold(Some((rx, true)), |state| async move {
            let (mut rx, first) = state?;
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let snapshot = rx.borrow_and_update().clone();
            let next = if snapshot.status.is_terminal() {
                None
            } else {
                Some((rx, false))
            };
            Some((snapshot, next))
        }))
    }

    /// Waits for the run to reach quiescence and returns its final report.
    pub async fn wait(&self, run_id: RunId) -> Result<RunReport, EngineError> {
        let mut rx = {
            let runs = self.runs.lock().await;
            runs.get(&run_id)
                .map(|handle| handle.report.clone())
                .ok_or(EngineError::RunNotFound(run_id))?
        };
        let report = rx
            .wait_for(|report| report.is_some())
            .await
            .ok()
            .and_then(|report| (*report).clone());
        report.ok_or(EngineError::RunAborted(run_id))
    }
}
