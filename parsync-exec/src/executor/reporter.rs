use chrono::Utc;
use parsync_core::{BatchOutcome, FailedItem, RunId, RunState, RunStatus};
use tokio::sync::watch;

use crate::executor::result::RunError;
use crate::executor::types::RunReport;

/// Sole writer of a run's [`RunState`]. Observers read snapshots through the watch channel.
pub struct StatusReporter {
    tx: watch::Sender<RunState>,
    succeeded: Vec<String>,
    failed: Vec<FailedItem>,
}

impl StatusReporter {
    pub fn new(run_id: RunId) -> (Self, watch::Receiver<RunState>) {
        let (tx, rx) = watch::channel(RunState::new(run_id));
        (
            Self {
                tx,
                succeeded: Vec::new(),
                failed: Vec::new(),
            },
            rx,
        )
    }

    pub fn snapshot(&self) -> RunState {
        self.tx.borrow().clone()
    }

    /// Moves the run to `next` if the lifecycle allows it. Returns whether it moved.
    pub fn transition(&self, next: RunStatus) -> bool {
        self.tx.send_if_modified(|state| {
            if !state.status.can_transition_to(next) {
                return false;
            }
            state.status = next;
            match next {
                RunStatus::Running => state.started_at = Some(Utc::now()),
                RunStatus::Stopped => state.finished_at = Some(Utc::now()),
                _ => {}
            }
            true
        })
    }

    pub fn record_dispatch(&self) {
        self.tx.send_modify(|state| state.dispatched_batches += 1);
    }

    pub fn apply(&mut self, outcome: BatchOutcome) {
        let succeeded = outcome.succeeded_items.len() as u64;
        let failed = outcome.failed_items.len() as u64;
        self.tx.send_modify(|state| {
            if failed == 0 {
                state.completed_batches += 1;
            } else {
                state.failed_batches += 1;
            }
            state.succeeded_items += succeeded;
            state.failed_items += failed;
        });
        self.succeeded
            .extend(outcome.succeeded_items.into_iter().map(|item| item.id));
        self.failed.extend(outcome.failed_items);
    }

    pub fn set_pool(&self, active_workers: u32, busy_workers: u32, queued_batches: u64) {
        self.tx.send_if_modified(|state| {
            let changed = state.active_workers != active_workers
                || state.busy_workers != busy_workers
                || state.queued_batches != queued_batches;
            state.active_workers = active_workers;
            state.busy_workers = busy_workers;
            state.queued_batches = queued_batches;
            changed
        });
    }

    pub fn set_error(&self, error: &RunError) {
        let message = error.to_string();
        self.tx.send_modify(|state| state.error = Some(message));
    }

    /// Publishes the terminal snapshot and assembles the report.
    pub fn finish(self, cancelled: Vec<String>, error: Option<RunError>) -> RunReport {
        if let Some(error) = &error {
            self.set_error(error);
        }
        self.set_pool(0, 0, 0);
        self.transition(RunStatus::Stopped);
        let state = self.snapshot();
        RunReport {
            run_id: state.run_id,
            state,
            succeeded: self.succeeded,
            failed: self.failed,
            cancelled,
            error,
        }
    }
}
