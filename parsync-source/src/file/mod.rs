use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parsync_core::{OperationType, WorkItem};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use crate::source::{ItemSource, ItemStream, SourceError};

/// Reads work items from a JSON Lines file, one `WorkItem` object per line.
///
/// Lines are parsed lazily as the engine pulls. Blank lines and lines starting with `#`
/// are ignored. A malformed line is a source error, not a per-item failure.
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    path: PathBuf,
}

impl JsonLinesSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ItemSource for JsonLinesSource {
    async fn fetch_pending(
        &self,
        operation_type: OperationType,
    ) -> Result<Box<dyn ItemStream>, SourceError> {
        let file = File::open(&self.path).await.map_err(|e| {
            SourceError::Unavailable(format!("failed to open {}: {e}", self.path.display()))
        })?;
        Ok(Box::new(JsonLinesStream {
            path: self.path.clone(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
            operation_type,
        }))
    }
}

struct JsonLinesStream {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
    operation_type: OperationType,
}

#[async_trait]
impl ItemStream for JsonLinesStream {
    async fn next_item(&mut self) -> Result<Option<WorkItem>, SourceError> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_no += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let item: WorkItem =
                serde_json::from_str(trimmed).map_err(|e| SourceError::Malformed {
                    location: format!("{}:{}", self.path.display(), self.line_no),
                    message: e.to_string(),
                })?;
            if self.operation_type.matches(item.kind) {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }
}
