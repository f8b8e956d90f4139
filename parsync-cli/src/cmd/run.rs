use std::path::Path;
use std::sync::Arc;

use parsync_exec::{EngineError, EventSink, RunReport, SyncEngine};
use parsync_source::JsonLinesSource;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{EngineArgs, EventsMode, OutputArgs, PlatformArgs};

use super::config::{build_engine_config, build_event_sink, build_executor, load_sync_config};
use super::progress::{CompositeProgressSink, ProgressEventSink};

pub async fn run_cmd(
    path: &Path,
    items: &Path,
    events: EventsMode,
    output: OutputArgs,
    platform: PlatformArgs,
    engine_args: EngineArgs,
) -> i32 {
    let (config, _format) = match load_sync_config(path, &output) {
        Ok(v) => v,
        Err(code) => return code,
    };

    let executor = match build_executor(&platform) {
        Ok(e) => e,
        Err(e) => {
            print_error(output.format, output.quiet, &e);
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let base = build_event_sink(events);
    let sink: Arc<dyn EventSink> = if output.format == OutputFormat::Text && !output.quiet {
        Arc::new(CompositeProgressSink::new(
            Arc::new(ProgressEventSink::new()),
            base,
        ))
    } else {
        base
    };

    let engine = SyncEngine::new(build_engine_config(&engine_args), executor, sink);
    let source = Arc::new(JsonLinesSource::new(items));

    let run_id = match engine.start_sync(config, source).await {
        Ok(id) => id,
        Err(EngineError::Config(e)) => {
            print_error(
                output.format,
                output.quiet,
                &format!("config rejected ({}): {e}", e.code()),
            );
            return exit_codes::VALIDATION_FAILED;
        }
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
    };
    tracing::info!(run_id = %run_id, items = %items.display(), "sync started");

    let report = tokio::select! {
        report = engine.wait(run_id) => report,
        _ = tokio::signal::ctrl_c() => {
            if let Err(e) = engine.stop_sync(run_id).await {
                tracing::warn!("stop failed: {e}");
            }
            engine.wait(run_id).await
        }
    };

    let report = match report {
        Ok(r) => r,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
    };

    if output.format == OutputFormat::Text && !output.quiet {
        print_summary(&report);
    } else {
        print_result(output.format, output.quiet, &report.to_json());
    }

    if report.failed.is_empty() && report.error.is_none() {
        exit_codes::SUCCESS
    } else {
        exit_codes::RUN_FAILED
    }
}

fn print_summary(report: &RunReport) {
    let state = &report.state;
    println!("run {} {}", report.run_id, state.status.as_str());
    println!(
        "  batches: {} completed, {} failed",
        state.completed_batches, state.failed_batches
    );
    println!(
        "  items:   {} succeeded, {} failed, {} cancelled",
        report.succeeded.len(),
        report.failed.len(),
        report.cancelled.len()
    );
    for failed in &report.failed {
        println!(
            "  - {} {} (attempt {}): {}",
            failed.item.kind.as_str(),
            failed.item.id,
            failed.attempt,
            failed.error
        );
    }
    if let Some(error) = &report.error {
        println!("  error: {error}");
    }
}
