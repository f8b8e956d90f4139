use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parsync_core::{OperationType, WorkItem};
use tokio::sync::Mutex;

use crate::source::{ItemSource, ItemStream, SourceError};

/// In-memory item source. Each `fetch_pending` call yields a fresh pass over the items.
///
/// An optional failure point makes the stream error after a number of items, which is
/// how callers exercise the engine's handling of a source that goes away mid-run.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    items: Arc<Mutex<Vec<WorkItem>>>,
    fail_after: Option<usize>,
}

impl MemorySource {
    pub fn new(items: Vec<WorkItem>) -> Self {
        Self {
            items: Arc::new(Mutex::new(items)),
            fail_after: None,
        }
    }

    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub async fn push(&self, item: WorkItem) {
        self.items.lock().await.push(item);
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

#[async_trait]
impl ItemSource for MemorySource {
    async fn fetch_pending(
        &self,
        operation_type: OperationType,
    ) -> Result<Box<dyn ItemStream>, SourceError> {
        let items: VecDeque<WorkItem> = self
            .items
            .lock()
            .await
            .iter()
            .filter(|i| operation_type.matches(i.kind))
            .cloned()
            .collect();
        Ok(Box::new(MemoryStream {
            items,
            yielded: 0,
            fail_after: self.fail_after,
        }))
    }
}

struct MemoryStream {
    items: VecDeque<WorkItem>,
    yielded: usize,
    fail_after: Option<usize>,
}

#[async_trait]
impl ItemStream for MemoryStream {
    async fn next_item(&mut self) -> Result<Option<WorkItem>, SourceError> {
        if let Some(limit) = self.fail_after {
            if self.yielded >= limit {
                return Err(SourceError::Unavailable(format!(
                    "source went away after {limit} items"
                )));
            }
        }
        let next = self.items.pop_front();
        if next.is_some() {
            self.yielded += 1;
        }
        Ok(next)
    }
}
