use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parsync_core::{parse_config_str, ConfigFormat, ParseError, SyncConfig};
use parsync_exec::executor::{
    HttpOperationExecutor, NoOpEventSink, ReqwestHttpClient, SimulatedExecutor, StdoutEventSink,
    TracingEventSink,
};
use parsync_exec::retry::RetryConfig;
use parsync_exec::{EngineConfig, EventSink, OperationExecutor};

use crate::exit_codes;
use crate::output::print_error;
use crate::{EngineArgs, EventsMode, ExecutorKind, OutputArgs, PlatformArgs};

/// Reads and parses a config document. Errors are printed; the `Err` carries the exit code.
pub fn load_sync_config(path: &Path, output: &OutputArgs) -> Result<(SyncConfig, ConfigFormat), i32> {
    let content = match std::fs::read_to_string(path) {
        Ok(v) => v,
        Err(e) => {
            print_error(
                output.format,
                output.quiet,
                &format!("failed to read {}: {e}", path.display()),
            );
            return Err(exit_codes::RUNTIME_ERROR);
        }
    };

    match parse_config_str(&content, ConfigFormat::Auto) {
        Ok(parsed) => Ok((parsed.config, parsed.format)),
        Err(e) => {
            let message = match e {
                ParseError::Json(e) => format!("JSON parse failed: {e}"),
                ParseError::Yaml(e) => format!("YAML parse failed: {e}"),
                ParseError::UnknownFormat => "input is neither valid JSON nor valid YAML".to_string(),
            };
            print_error(output.format, output.quiet, &message);
            Err(exit_codes::VALIDATION_FAILED)
        }
    }
}

pub fn build_engine_config(args: &EngineArgs) -> EngineConfig {
    let defaults = RetryConfig::default();
    EngineConfig {
        retry: RetryConfig {
            base_delay: args
                .retry_base_delay
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
            max_delay: args
                .retry_max_delay
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_delay),
            ..defaults
        },
        queue_capacity: args.queue_capacity,
        cost_high_water: args.cost_high_water,
    }
}

pub fn build_executor(platform: &PlatformArgs) -> Result<Arc<dyn OperationExecutor>, String> {
    match platform.executor {
        ExecutorKind::Simulate => {
            let mut exec = SimulatedExecutor::new(platform.fail_rate, platform.fatal_rate)
                .with_latency(Duration::from_millis(platform.latency_ms));
            if let Some(seed) = platform.seed {
                exec = exec.with_seed(seed);
            }
            Ok(Arc::new(exec))
        }
        ExecutorKind::Http => {
            let raw = platform
                .platform_url
                .as_deref()
                .ok_or_else(|| "--platform-url is required with --executor http".to_string())?;
            let base = url::Url::parse(raw).map_err(|e| format!("invalid --platform-url: {e}"))?;
            let client = ReqwestHttpClient::new().map_err(|e| e.to_string())?;

            let mut exec = HttpOperationExecutor::new(Arc::new(client), base, &platform.collection);
            for header in &platform.headers {
                let (name, value) = header
                    .split_once('=')
                    .ok_or_else(|| format!("invalid --header {header:?}: expected NAME=VALUE"))?;
                exec = exec.with_header(name.trim(), value.trim());
            }
            Ok(Arc::new(exec))
        }
    }
}

pub fn build_event_sink(mode: EventsMode) -> Arc<dyn EventSink> {
    match mode {
        EventsMode::None => Arc::new(NoOpEventSink),
        EventsMode::Stdout => Arc::new(StdoutEventSink),
        EventsMode::Log => Arc::new(TracingEventSink),
    }
}
