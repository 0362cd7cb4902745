//! Default layer for config composition.

use crate::config::SyncConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

/// Builder seeded with `SyncConfig::default()` so every later source is a partial overlay.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let defaults = Config::try_from(&SyncConfig::default())?;
    Ok(Config::builder().add_source(defaults))
}
