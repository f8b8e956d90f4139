use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use parsync_core::{Batch, BatchId, BatchOutcome, FailedItem, FatalItemError, RunId, WorkItem};
use tokio::sync::mpsc;

use crate::executor::operation::{OperationError, OperationExecutor};
use crate::executor::{Event, EventSink};
use crate::retry::{decide_retry, RetryConfig, RetryDecision, RetryReason};

pub type WorkerId = u32;

/// Shared, read-only inputs every worker of a run needs.
pub struct WorkerContext {
    pub run_id: RunId,
    pub executor: Arc<dyn OperationExecutor>,
    pub retry: RetryConfig,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub event_sink: Arc<dyn EventSink>,
}

#[derive(Debug)]
pub struct WorkerReport {
    pub worker_id: WorkerId,
    pub outcome: BatchOutcome,
}

enum ItemResult {
    Succeeded,
    Failed { error: FatalItemError, attempt: u32 },
}

/// Worker loop: take one batch at a time from `inbox`, run it to completion, report back.
///
/// Exits when the scheduler drops the inbox sender. A batch that has been received is
/// always finished; stopping the run never interrupts a batch mid-flight.
pub async fn run(
    worker_id: WorkerId,
    ctx: Arc<WorkerContext>,
    mut inbox: mpsc::Receiver<Batch>,
    reports: mpsc::Sender<WorkerReport>,
) {
    tracing::debug!(run_id = %ctx.run_id, worker_id, "worker started");
    while let Some(batch) = inbox.recv().await {
        let outcome = execute_batch(worker_id, &ctx, batch).await;
        if reports
            .send(WorkerReport { worker_id, outcome })
            .await
            .is_err()
        {
            tracing::warn!(run_id = %ctx.run_id, worker_id, "scheduler gone; dropping batch report");
            break;
        }
    }
    tracing::debug!(run_id = %ctx.run_id, worker_id, "worker exiting");
}

pub async fn execute_batch(worker_id: WorkerId, ctx: &WorkerContext, batch: Batch) -> BatchOutcome {
    let started = Instant::now();
    let batch_id = batch.id;
    let mut succeeded_items = Vec::new();
    let mut failed_items = Vec::new();

    for item in batch.items {
        match execute_item(ctx, batch_id, &item).await {
            ItemResult::Succeeded => succeeded_items.push(item),
            ItemResult::Failed { error, attempt } => {
                tracing::warn!(
                    run_id = %ctx.run_id,
                    worker_id,
                    batch_id = %batch_id,
                    item_id = %item.id,
                    attempt,
                    "item failed: {error}"
                );
                ctx.event_sink
                    .emit(Event::ItemFailed {
                        run_id: ctx.run_id,
                        batch_id,
                        item_id: item.id.clone(),
                        attempt,
                        error: error.to_string(),
                    })
                    .await;
                failed_items.push(FailedItem {
                    item,
                    error,
                    attempt,
                });
            }
        }
    }

    BatchOutcome {
        batch_id,
        succeeded_items,
        failed_items,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

async fn execute_item(ctx: &WorkerContext, batch_id: BatchId, item: &WorkItem) -> ItemResult {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let (error, timed_out) = match attempt_once(ctx, item).await {
            Ok(()) => return ItemResult::Succeeded,
            Err(e) => e,
        };

        match decide_retry(&ctx.retry, attempt, ctx.max_attempts, &error, || fastrand::u64(..)) {
            RetryDecision::RetryAfter { delay, .. } => {
                tracing::debug!(
                    run_id = %ctx.run_id,
                    item_id = %item.id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying: {}",
                    error.message()
                );
                ctx.event_sink
                    .emit(Event::ItemRetryScheduled {
                        run_id: ctx.run_id,
                        batch_id,
                        item_id: item.id.clone(),
                        attempt,
                        delay_ms: delay.as_millis() as u64,
                        timed_out,
                    })
                    .await;
                tokio::time::sleep(delay).await;
            }
            RetryDecision::Stop {
                reason: RetryReason::AttemptsExhausted,
            } => {
                return ItemResult::Failed {
                    error: FatalItemError::RetriesExhausted {
                        attempts: attempt,
                        last_error: error.message().to_string(),
                    },
                    attempt,
                }
            }
            RetryDecision::Stop { .. } => {
                return ItemResult::Failed {
                    error: FatalItemError::Rejected {
                        message: error.message().to_string(),
                    },
                    attempt,
                }
            }
        }
    }
}

/// One attempt under the run's timeout. A panicking executor counts as a fatal rejection.
async fn attempt_once(ctx: &WorkerContext, item: &WorkItem) -> Result<(), (OperationError, bool)> {
    let call = AssertUnwindSafe(ctx.executor.execute(item)).catch_unwind();
    match tokio::time::timeout(ctx.timeout, call).await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(e))) => Err((e, false)),
        Ok(Err(_panic)) => Err((
            OperationError::fatal(format!("executor panicked while processing {}", item.id)),
            false,
        )),
        Err(_elapsed) => Err((OperationError::timeout(ctx.timeout), true)),
    }
}
