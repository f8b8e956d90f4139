//! Groups work items into bounded batches.
//!
//! The batcher is a pure state machine: the runtime feeds it items pulled from the
//! item source and dispatches whatever batches fall out. Items keep their source
//! order, both inside a batch and across batch boundaries.

use crate::types::{Batch, BatchId, OperationType, SyncConfig, WorkItem};

#[derive(Debug)]
pub struct Batcher {
    batch_size: usize,
    operation_type: OperationType,
    next_id: u64,
    pending: Vec<WorkItem>,
    skipped: u64,
}

impl Batcher {
    pub fn new(config: &SyncConfig) -> Self {
        let batch_size = config.batch_size.max(1) as usize;
        Self {
            batch_size,
            operation_type: config.operation_type,
            next_id: 0,
            pending: Vec::with_capacity(batch_size),
            skipped: 0,
        }
    }

    /// Feed one item. Returns a full batch once `batch_size` matching items have accumulated.
    pub fn push(&mut self, item: WorkItem) -> Option<Batch> {
        if !self.operation_type.matches(item.kind) {
            self.skipped += 1;
            return None;
        }
        self.pending.push(item);
        if self.pending.len() >= self.batch_size {
            return Some(self.take());
        }
        None
    }

    /// Flush the trailing partial batch, if any. It is dispatched as-is, never padded.
    pub fn finish(&mut self) -> Option<Batch> {
        if self.pending.is_empty() {
            return None;
        }
        Some(self.take())
    }

    /// Items dropped because their kind did not match the configured operation type.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn batches_emitted(&self) -> u64 {
        self.next_id
    }

    fn take(&mut self) -> Batch {
        let items = std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size));
        let id = BatchId(self.next_id);
        self.next_id += 1;
        Batch { id, items }
    }
}

pub fn plan_batches<I>(items: I, config: &SyncConfig) -> Vec<Batch>
where
    I: IntoIterator<Item = WorkItem>,
{
    let mut batcher = Batcher::new(config);
    let mut batches: Vec<Batch> = items.into_iter().filter_map(|i| batcher.push(i)).collect();
    batches.extend(batcher.finish());
    batches
}
