use std::sync::Arc;

use parsync_core::{Batch, Batcher, RunId, SyncConfig};
use parsync_source::{ItemSource, ItemStream, SourceError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendError;

/// Pulls pending items from the source, cuts them into batches and feeds the scheduler.
///
/// Stops pulling once the scheduler closes its end of `batches`. A source failure is
/// forwarded once and ends production. Returns every batch it cut but could not hand
/// over, so the scheduler can account for those items as cancelled.
pub async fn produce(
    run_id: RunId,
    config: SyncConfig,
    source: Arc<dyn ItemSource>,
    batches: mpsc::Sender<Result<Batch, SourceError>>,
) -> Vec<Batch> {
    let mut unsent = Vec::new();
    let fetched = tokio::select! {
        _ = batches.closed() => return unsent,
        fetched = source.fetch_pending(config.operation_type) => fetched,
    };
    let mut stream = match fetched {
        Ok(stream) => stream,
        Err(e) => {
            let _ = batches.send(Err(e)).await;
            return unsent;
        }
    };

    let mut batcher = Batcher::new(&config);
    loop {
        let next = tokio::select! {
            _ = batches.closed() => {
                tracing::debug!(run_id = %run_id, "scheduler stopped listening; producer exiting");
                break;
            }
            next = next_batch(stream.as_mut(), &mut batcher) => next,
        };
        match next {
            Ok(Some(batch)) => {
                if let Err(SendError(msg)) = batches.send(Ok(batch)).await {
                    unsent.extend(msg.ok());
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                let _ = batches.send(Err(e)).await;
                break;
            }
        }
    }

    // Items already pulled into a partial batch still need a disposition.
    unsent.extend(batcher.finish());

    if batcher.skipped() > 0 {
        tracing::debug!(
            run_id = %run_id,
            skipped = batcher.skipped(),
            "items outside the configured operation type were skipped"
        );
    }
    unsent
}

/// Reads until a full batch is cut or the stream ends (yielding the partial tail).
pub async fn next_batch(
    stream: &mut dyn ItemStream,
    batcher: &mut Batcher,
) -> Result<Option<Batch>, SourceError> {
    while let Some(item) = stream.next_item().await? {
        if let Some(batch) = batcher.push(item) {
            return Ok(Some(batch));
        }
    }
    Ok(batcher.finish())
}
