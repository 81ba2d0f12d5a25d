//! Configuration loader (file + env merge).

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use thiserror::Error;

use crate::schema::KilnConfig;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to load or merge configuration.
    #[error("configuration error: {0}")]
    Load(String),
}

/// Loads configuration by merging layers:
/// 1. Default values
/// 2. Config file (if given; a missing file contributes nothing)
/// 3. Environment variables (`KILN_` prefix, `__` between nested keys,
///    e.g. `KILN_RUNTIME__ALLOW_UNSIGNED=true`)
pub fn load_config(config_path: Option<&str>) -> Result<KilnConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(KilnConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("KILN_").split("__"));

    figment
        .extract()
        .map_err(|e| ConfigError::Load(e.to_string()))
}
