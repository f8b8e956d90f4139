mod rules;

use crate::error::ConfigError;
use crate::types::SyncConfig;

pub trait Validate {
    fn validate(&self) -> Result<(), ConfigError>;
}

impl Validate for SyncConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        rules::check(self, true)
    }
}

/// Admit a config for a run. Returns the config unchanged when every rule passes,
/// otherwise the first violated rule.
pub fn validate_config(config: SyncConfig) -> Result<SyncConfig, ConfigError> {
    rules::check(&config, true)?;
    Ok(config)
}

/// Same checks as [`validate_config`] minus the `enabled` flag, for configs that are
/// stored but not started.
pub fn validate_fields(config: &SyncConfig) -> Result<(), ConfigError> {
    rules::check(config, false)
}
