use std::path::Path;

use parsync_core::{validate_fields, ConfigError, SyncConfig, Validate};
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_result, OutputFormat};
use crate::OutputArgs;

use super::config::load_sync_config;

#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<SyncConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn validate_cmd(path: &Path, allow_disabled: bool, output: OutputArgs) -> i32 {
    let (config, format) = match load_sync_config(path, &output) {
        Ok(v) => v,
        Err(code) => return code,
    };

    let checked: Result<(), ConfigError> = if allow_disabled {
        validate_fields(&config)
    } else {
        config.validate()
    };

    match checked {
        Ok(()) => {
            if output.format == OutputFormat::Text && !output.quiet {
                println!("ok: valid sync config ({format:?})");
                if !config.enabled {
                    println!("note: sync is disabled; this config cannot start a run");
                }
            } else {
                print_result(
                    output.format,
                    output.quiet,
                    &ValidateResult {
                        valid: true,
                        format: format!("{format:?}"),
                        config: Some(config),
                        code: None,
                        error: None,
                    },
                );
            }
            exit_codes::SUCCESS
        }
        Err(err) => {
            if output.format == OutputFormat::Text && !output.quiet {
                eprintln!("error: config rejected ({}): {err}", err.code());
            } else {
                print_result(
                    output.format,
                    output.quiet,
                    &ValidateResult {
                        valid: false,
                        format: format!("{format:?}"),
                        config: None,
                        code: Some(err.code()),
                        error: Some(err.to_string()),
                    },
                );
            }
            exit_codes::VALIDATION_FAILED
        }
    }
}
