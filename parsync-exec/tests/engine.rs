use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use parsync_core::{
    ConfigError, FatalItemError, OperationKind, OperationType, RunStatus, Strategy, SyncConfig,
    WorkItem,
};
use parsync_exec::executor::SimulatedExecutor;
use parsync_exec::retry::RetryConfig;
use parsync_exec::{
    EngineConfig, EngineError, Event, EventSink, OperationError, OperationExecutor, RunError,
    SyncEngine,
};
use parsync_source::{ItemSource, ItemStream, MemorySource, SourceError};
use tokio::sync::{Mutex, Notify, Semaphore};

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn emit(&self, event: Event) {
        self.events.lock().await.push(event);
    }
}

impl RecordingSink {
    async fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.name() == name)
            .count()
    }
}

/// Wraps another executor and counts attempts per item.
struct CountingExecutor {
    inner: Arc<dyn OperationExecutor>,
    attempts: Mutex<HashMap<String, u32>>,
}

impl CountingExecutor {
    fn new(inner: Arc<dyn OperationExecutor>) -> Self {
        Self {
            inner,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    async fn attempts(&self, id: &str) -> u32 {
        self.attempts.lock().await.get(id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl OperationExecutor for CountingExecutor {
    async fn execute(&self, item: &WorkItem) -> Result<(), OperationError> {
        *self.attempts.lock().await.entry(item.id.clone()).or_default() += 1;
        self.inner.execute(item).await
    }
}

/// Holds every item until the test releases permits.
struct GatedExecutor {
    started: Notify,
    gate: Semaphore,
}

impl GatedExecutor {
    fn new() -> Self {
        Self {
            started: Notify::new(),
            gate: Semaphore::new(0),
        }
    }

    fn open(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }
}

#[async_trait]
impl OperationExecutor for GatedExecutor {
    async fn execute(&self, _item: &WorkItem) -> Result<(), OperationError> {
        self.started.notify_one();
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| OperationError::fatal(e.to_string()))?;
        Ok(())
    }
}

/// Tracks how many items are executing at once and the highest that ever got.
#[derive(Default)]
struct ConcurrencyExecutor {
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl OperationExecutor for ConcurrencyExecutor {
    async fn execute(&self, _item: &WorkItem) -> Result<(), OperationError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Counts every item the engine pulls out of the wrapped source.
struct CountingSource {
    inner: MemorySource,
    pulled: Arc<AtomicUsize>,
}

struct CountingStream {
    inner: Box<dyn ItemStream>,
    pulled: Arc<AtomicUsize>,
}

#[async_trait]
impl ItemSource for CountingSource {
    async fn fetch_pending(
        &self,
        operation_type: OperationType,
    ) -> Result<Box<dyn ItemStream>, SourceError> {
        let inner = self.inner.fetch_pending(operation_type).await?;
        Ok(Box::new(CountingStream {
            inner,
            pulled: self.pulled.clone(),
        }))
    }
}

#[async_trait]
impl ItemStream for CountingStream {
    async fn next_item(&mut self) -> Result<Option<WorkItem>, SourceError> {
        let item = self.inner.next_item().await?;
        if item.is_some() {
            self.pulled.fetch_add(1, Ordering::SeqCst);
        }
        Ok(item)
    }
}

struct PanickingExecutor;

#[async_trait]
impl OperationExecutor for PanickingExecutor {
    async fn execute(&self, item: &WorkItem) -> Result<(), OperationError> {
        if item.id == "item-3" {
            panic!("executor bug");
        }
        Ok(())
    }
}

fn items(n: usize) -> Vec<WorkItem> {
    (0..n)
        .map(|i| WorkItem::new(format!("item-{i}"), OperationKind::Update, serde_json::json!({ "sku": i })))
        .collect()
}

fn scenario_config() -> SyncConfig {
    SyncConfig {
        enabled: true,
        min_workers: 1,
        max_workers: 4,
        batch_size: 50,
        strategy: Strategy::Balanced,
        retry_attempts: 3,
        timeout_ms: 300_000,
        ..Default::default()
    }
}

fn fast_retry() -> EngineConfig {
    EngineConfig {
        retry: RetryConfig {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn engine(executor: Arc<dyn OperationExecutor>) -> (SyncEngine, Arc<RecordingSink>) {
    engine_with(fast_retry(), executor)
}

fn engine_with(
    config: EngineConfig,
    executor: Arc<dyn OperationExecutor>,
) -> (SyncEngine, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let engine = SyncEngine::new(config, executor, sink.clone());
    (engine, sink)
}

#[tokio::test]
async fn balanced_run_of_120_items_completes_in_three_batches() {
    let (engine, sink) = engine(Arc::new(SimulatedExecutor::default()));
    let source = Arc::new(MemorySource::new(items(120)));

    let run_id = engine.start_sync(scenario_config(), source).await.unwrap();
    let report = engine.wait(run_id).await.unwrap();

    assert_eq!(report.state.status, RunStatus::Stopped);
    assert_eq!(report.state.completed_batches, 3);
    assert_eq!(report.state.failed_batches, 0);
    assert_eq!(report.succeeded.len(), 120);
    assert!(report.failed.is_empty());
    assert!(report.cancelled.is_empty());
    assert!(report.error.is_none());
    assert!(report.state.started_at.is_some() && report.state.finished_at.is_some());

    let dispatched: Vec<usize> = sink
        .events
        .lock()
        .await
        .iter()
        .filter_map(|e| match e {
            Event::BatchDispatched { items, .. } => Some(*items),
            _ => None,
        })
        .collect();
    let mut sizes = dispatched.clone();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![20, 50, 50]);
    assert_eq!(sink.count("run.finished").await, 1);
}

#[tokio::test]
async fn fatal_item_fails_on_first_attempt_without_retry() {
    let mut input = items(120);
    input[7].payload = serde_json::json!({ "simulate": "fatal" });
    let counting = Arc::new(CountingExecutor::new(Arc::new(SimulatedExecutor::default())));
    let (engine, sink) = engine(counting.clone());

    let run_id = engine
        .start_sync(scenario_config(), Arc::new(MemorySource::new(input)))
        .await
        .unwrap();
    let report = engine.wait(run_id).await.unwrap();

    assert_eq!(report.succeeded.len(), 119);
    assert_eq!(report.failed.len(), 1);
    let failed = &report.failed[0];
    assert_eq!(failed.item.id, "item-7");
    assert_eq!(failed.attempt, 1);
    assert!(matches!(failed.error, FatalItemError::Rejected { .. }));
    assert_eq!(counting.attempts("item-7").await, 1);

    assert_eq!(report.state.failed_batches, 1);
    assert_eq!(report.state.completed_batches, 2);
    assert_eq!(report.state.status, RunStatus::Stopped);
    assert_eq!(sink.count("item.failed").await, 1);
    assert_eq!(sink.count("item.retry_scheduled").await, 0);
}

#[tokio::test(start_paused = true)]
async fn retryable_item_gets_retry_attempts_plus_one_tries() {
    let mut input = items(5);
    input[2].payload = serde_json::json!({ "simulate": "retryable" });
    let counting = Arc::new(CountingExecutor::new(Arc::new(SimulatedExecutor::default())));
    let (engine, sink) = engine(counting.clone());

    let config = SyncConfig {
        retry_attempts: 2,
        ..scenario_config()
    };
    let run_id = engine
        .start_sync(config, Arc::new(MemorySource::new(input)))
        .await
        .unwrap();
    let report = engine.wait(run_id).await.unwrap();

    assert_eq!(counting.attempts("item-2").await, 3);
    assert_eq!(counting.attempts("item-1").await, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].attempt, 3);
    match &report.failed[0].error {
        FatalItemError::RetriesExhausted { attempts, .. } => assert_eq!(*attempts, 3),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(sink.count("item.retry_scheduled").await, 2);
}

#[tokio::test(start_paused = true)]
async fn timed_out_attempt_consumes_a_retry() {
    let mut input = items(3);
    input[0].payload = serde_json::json!({ "simulate": "hang" });
    let counting = Arc::new(CountingExecutor::new(Arc::new(SimulatedExecutor::default())));
    let (engine, sink) = engine(counting.clone());

    let config = SyncConfig {
        retry_attempts: 1,
        timeout_ms: 10_000,
        ..scenario_config()
    };
    let run_id = engine
        .start_sync(config, Arc::new(MemorySource::new(input)))
        .await
        .unwrap();
    let report = engine.wait(run_id).await.unwrap();

    assert_eq!(counting.attempts("item-0").await, 2);
    assert_eq!(report.succeeded.len(), 2);
    match &report.failed[0].error {
        FatalItemError::RetriesExhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(*attempts, 2);
            assert!(last_error.contains("timed out"), "{last_error}");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let timed_out = sink.events.lock().await.iter().any(|e| {
        matches!(e, Event::ItemRetryScheduled { timed_out: true, item_id, .. } if item_id == "item-0")
    });
    assert!(timed_out);
}

#[tokio::test]
async fn stop_finishes_in_flight_batch_and_dispatches_nothing_more() {
    let gated = Arc::new(GatedExecutor::new());
    let (engine, sink) = engine(gated.clone());
    let config = SyncConfig {
        min_workers: 1,
        max_workers: 1,
        batch_size: 10,
        ..scenario_config()
    };

    let run_id = engine
        .start_sync(config, Arc::new(MemorySource::new(items(50))))
        .await
        .unwrap();
    gated.started.notified().await;

    let ack = engine.stop_sync(run_id).await.unwrap();
    assert_eq!(ack.run_id, run_id);
    assert_eq!(ack.status, RunStatus::Stopping);
    gated.open();

    let report = engine.wait(run_id).await.unwrap();
    assert_eq!(report.state.status, RunStatus::Stopped);
    assert_eq!(report.state.dispatched_batches, 1);
    assert_eq!(report.state.completed_batches, 1);
    assert_eq!(report.succeeded.len(), 10);
    assert!(report.failed.is_empty());
    assert!(report.error.is_none());
    assert!(report
        .cancelled
        .iter()
        .all(|id| !report.succeeded.contains(id)));
    assert_eq!(sink.count("batch.dispatched").await, 1);
    assert_eq!(sink.count("run.stopping").await, 1);

    let ack = engine.stop_sync(run_id).await.unwrap();
    assert_eq!(ack.status, RunStatus::Stopped);
}

#[tokio::test]
async fn stop_accounts_for_every_item_pulled_from_the_source() {
    let gated = Arc::new(GatedExecutor::new());
    // A one-slot queue and channel leave the producer blocked mid-send with a cut batch.
    let (engine, _sink) = engine_with(
        EngineConfig {
            queue_capacity: 1,
            ..fast_retry()
        },
        gated.clone(),
    );
    let pulled = Arc::new(AtomicUsize::new(0));
    let source = Arc::new(CountingSource {
        inner: MemorySource::new(items(50)),
        pulled: pulled.clone(),
    });
    let config = SyncConfig {
        min_workers: 1,
        max_workers: 1,
        batch_size: 10,
        ..scenario_config()
    };

    let run_id = engine.start_sync(config, source).await.unwrap();
    gated.started.notified().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    engine.stop_sync(run_id).await.unwrap();
    gated.open();
    let report = engine.wait(run_id).await.unwrap();

    let pulled = pulled.load(Ordering::SeqCst);
    let accounted = report.succeeded.len() + report.failed.len() + report.cancelled.len();
    assert_eq!(accounted, pulled, "{report:?}");
    assert_eq!(pulled % 10, 0);
    assert!(pulled < 50, "producer kept pulling after stop: {pulled}");
    assert_eq!(report.succeeded.len(), 10);
    assert!(!report.cancelled.is_empty());
    assert_eq!(report.state.dispatched_batches, 1);
}

#[tokio::test(start_paused = true)]
async fn pool_stays_within_bounds_for_every_strategy() {
    for strategy in Strategy::ALL {
        let executor = Arc::new(ConcurrencyExecutor::default());
        let (engine, _sink) = engine(executor.clone());
        let config = SyncConfig {
            min_workers: 1,
            max_workers: 4,
            batch_size: 5,
            strategy,
            ..scenario_config()
        };

        let run_id = engine
            .start_sync(config, Arc::new(MemorySource::new(items(200))))
            .await
            .unwrap();
        let report = engine.wait(run_id).await.unwrap();

        let peak = executor.peak.load(Ordering::SeqCst);
        assert_eq!(report.succeeded.len(), 200, "{strategy:?}");
        assert!((1..=4).contains(&peak), "{strategy:?} peak={peak}");
        if strategy == Strategy::Speed {
            assert!(peak > 1, "speed never scaled past the floor with a backlog");
        }
    }
}

#[tokio::test]
async fn source_failure_stops_run_with_run_level_error() {
    let (engine, sink) = engine(Arc::new(SimulatedExecutor::default()));
    let source = Arc::new(MemorySource::new(items(30)).failing_after(15));
    let config = SyncConfig {
        batch_size: 10,
        ..scenario_config()
    };

    let run_id = engine.start_sync(config, source).await.unwrap();
    let report = engine.wait(run_id).await.unwrap();

    assert_eq!(report.state.status, RunStatus::Stopped);
    assert!(matches!(report.error, Some(RunError::Source(_))));
    assert!(report.state.error.is_some());
    assert!(report.failed.is_empty());
    // The partial batch cut before the failure is cancelled, not lost.
    assert_eq!(report.succeeded.len() + report.cancelled.len(), 15);
    assert_eq!(sink.count("run.stopping").await, 1);
}

#[tokio::test]
async fn invalid_config_is_rejected_and_starts_nothing() {
    let (engine, sink) = engine(Arc::new(SimulatedExecutor::default()));
    let config = SyncConfig {
        min_workers: 5,
        max_workers: 2,
        ..scenario_config()
    };

    let err = engine
        .start_sync(config, Arc::new(MemorySource::new(items(10))))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Config(ConfigError::WorkerRangeInvalid { min: 5, max: 2 })
    ));
    assert!(sink.events.lock().await.is_empty());

    let disabled = SyncConfig {
        enabled: false,
        ..scenario_config()
    };
    let err = engine
        .start_sync(disabled, Arc::new(MemorySource::new(items(10))))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Config(ConfigError::Disabled)));

    // Rejections leave no run behind that would block the next start.
    let run_id = engine
        .start_sync(scenario_config(), Arc::new(MemorySource::new(items(10))))
        .await
        .unwrap();
    assert_eq!(engine.wait(run_id).await.unwrap().succeeded.len(), 10);
}

#[tokio::test]
async fn only_one_run_executes_at_a_time() {
    let gated = Arc::new(GatedExecutor::new());
    let (engine, _sink) = engine(gated.clone());

    let first = engine
        .start_sync(scenario_config(), Arc::new(MemorySource::new(items(5))))
        .await
        .unwrap();
    let err = engine
        .start_sync(scenario_config(), Arc::new(MemorySource::new(items(5))))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RunAlreadyActive(id) if id == first));

    gated.open();
    engine.wait(first).await.unwrap();

    let second = engine
        .start_sync(scenario_config(), Arc::new(MemorySource::new(items(5))))
        .await
        .unwrap();
    assert_ne!(first, second);
    assert_eq!(engine.wait(second).await.unwrap().succeeded.len(), 5);
    assert_eq!(engine.get_status(first).await.unwrap().status, RunStatus::Stopped);
}

#[tokio::test]
async fn status_stream_ends_with_stopped_snapshot() {
    let (engine, _sink) = engine(Arc::new(SimulatedExecutor::default()));
    let run_id = engine
        .start_sync(scenario_config(), Arc::new(MemorySource::new(items(120))))
        .await
        .unwrap();

    let snapshots: Vec<_> = engine.status_stream(run_id).await.unwrap().collect().await;
    let last = snapshots.last().unwrap();
    assert_eq!(last.status, RunStatus::Stopped);
    assert_eq!(last.completed_batches, 3);
    assert_eq!(last.active_workers, 0);
    assert!(snapshots.iter().all(|s| s.run_id == run_id));
    assert!(snapshots
        .windows(2)
        .all(|w| w[0].finished_batches() <= w[1].finished_batches()));
}

#[tokio::test]
async fn operation_type_filters_items() {
    let mut input = items(9);
    for (i, item) in input.iter_mut().enumerate() {
        item.kind = if i % 3 == 0 {
            OperationKind::Create
        } else {
            OperationKind::Delete
        };
    }
    let (engine, _sink) = engine(Arc::new(SimulatedExecutor::default()));
    let config = SyncConfig {
        operation_type: OperationType::Create,
        ..scenario_config()
    };

    let run_id = engine
        .start_sync(config, Arc::new(MemorySource::new(input)))
        .await
        .unwrap();
    let report = engine.wait(run_id).await.unwrap();
    assert_eq!(report.succeeded, vec!["item-0", "item-3", "item-6"]);
}

#[tokio::test]
async fn panicking_executor_fails_only_that_item() {
    let (engine, _sink) = engine(Arc::new(PanickingExecutor));
    let run_id = engine
        .start_sync(scenario_config(), Arc::new(MemorySource::new(items(6))))
        .await
        .unwrap();
    let report = engine.wait(run_id).await.unwrap();

    assert_eq!(report.succeeded.len(), 5);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].item.id, "item-3");
    assert!(matches!(report.failed[0].error, FatalItemError::Rejected { .. }));
    assert!(report.error.is_none());
}

#[tokio::test]
async fn unknown_run_is_not_found() {
    let (engine, _sink) = engine(Arc::new(SimulatedExecutor::default()));
    let missing = parsync_core::RunId::new();
    assert!(matches!(
        engine.get_status(missing).await,
        Err(EngineError::RunNotFound(_))
    ));
    assert!(matches!(
        engine.stop_sync(missing).await,
        Err(EngineError::RunNotFound(_))
    ));
}
