use crate::error::ParseError;
use crate::types::SyncConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Auto,
}

#[derive(Debug, Clone)]
pub struct ParsedConfig {
    pub config: SyncConfig,
    pub format: ConfigFormat,
}

/// Parse a config document. Omitted fields take their defaults; validation is a separate step.
pub fn parse_config_str(input: &str, format: ConfigFormat) -> Result<ParsedConfig, ParseError> {
    match format {
        ConfigFormat::Json => Ok(ParsedConfig {
            config: serde_json::from_str::<SyncConfig>(input)?,
            format,
        }),
        ConfigFormat::Yaml => Ok(ParsedConfig {
            config: serde_yaml::from_str::<SyncConfig>(input)?,
            format,
        }),
        ConfigFormat::Auto => parse_config_auto(input),
    }
}

fn parse_config_auto(input: &str) -> Result<ParsedConfig, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::UnknownFormat);
    }

    // JSON objects start with `{`; everything else is tried as YAML first.
    if input.trim_start().starts_with('{') {
        return match serde_json::from_str::<SyncConfig>(input) {
            Ok(config) => Ok(ParsedConfig {
                config,
                format: ConfigFormat::Json,
            }),
            Err(e) => match serde_yaml::from_str::<SyncConfig>(input) {
                Ok(config) => Ok(ParsedConfig {
                    config,
                    format: ConfigFormat::Yaml,
                }),
                Err(_) => Err(ParseError::Json(e)),
            },
        };
    }

    match serde_yaml::from_str::<SyncConfig>(input) {
        Ok(config) => Ok(ParsedConfig {
            config,
            format: ConfigFormat::Yaml,
        }),
        Err(e) => {
            if let Ok(config) = serde_json::from_str::<SyncConfig>(input) {
                return Ok(ParsedConfig {
                    config,
                    format: ConfigFormat::Json,
                });
            }
            Err(ParseError::Yaml(e))
        }
    }
}
