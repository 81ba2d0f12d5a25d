//! Configuration schema types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level kiln configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KilnConfig {
    /// Loader runtime settings.
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// Isolation boundary settings.
    #[serde(default)]
    pub isolation: IsolationConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Root of the content-addressed artifact cache.
    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,
    /// TCP connect timeout for manifest and artifact downloads.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Deadline for reading a whole response.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Permit loading manifests without verifying a signature.
    /// Off unless set explicitly.
    #[serde(default)]
    pub allow_unsigned: bool,
    /// Consecutive digest mismatches tolerated per artifact before the
    /// cache stops downloading it.
    #[serde(default = "default_max_integrity_failures")]
    pub max_integrity_failures: u32,
}

impl RuntimeConfig {
    /// Returns the connect timeout as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the read timeout as a `Duration`.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            cache_root: default_cache_root(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            allow_unsigned: false,
            max_integrity_failures: default_max_integrity_failures(),
        }
    }
}

fn default_cache_root() -> PathBuf {
    PathBuf::from(".kiln/cache")
}
fn default_connect_timeout_ms() -> u64 {
    8_000
}
fn default_read_timeout_ms() -> u64 {
    20_000
}
fn default_max_integrity_failures() -> u32 {
    3
}

/// Isolation boundary settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IsolationConfig {
    /// Extra unit prefixes always resolved from the host scope, on top of
    /// the built-in list (e.g. `"host_app::api::"`).
    #[serde(default)]
    pub parent_first: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "kiln_runtime=trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
