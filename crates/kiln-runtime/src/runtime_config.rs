//! Configuration for the provider runtime.

use std::path::PathBuf;

use kiln_config::KilnConfig;
use kiln_isolation::ParentFirstPolicy;

use crate::net::Timeouts;

/// Configuration for `ProviderRuntime`.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Root of the artifact cache.
    pub cache_root: PathBuf,
    /// Network timeouts for manifest and artifact downloads.
    pub timeouts: Timeouts,
    /// Load manifests without signature verification when no key is given.
    pub allow_unsigned: bool,
    /// Consecutive digest mismatches tolerated per artifact (0 = unbounded).
    pub max_integrity_failures: u32,
    /// Unit prefixes resolved from the host scope first.
    pub parent_first: ParentFirstPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from(".kiln/cache"),
            timeouts: Timeouts::default(),
            allow_unsigned: false,
            max_integrity_failures: 3,
            parent_first: ParentFirstPolicy::default(),
        }
    }
}

impl From<&KilnConfig> for RuntimeConfig {
    fn from(cfg: &KilnConfig) -> Self {
        Self {
            cache_root: cfg.runtime.cache_root.clone(),
            timeouts: Timeouts {
                connect: cfg.runtime.connect_timeout(),
                read: cfg.runtime.read_timeout(),
            },
            allow_unsigned: cfg.runtime.allow_unsigned,
            max_integrity_failures: cfg.runtime.max_integrity_failures,
            parent_first: ParentFirstPolicy::with_extra(cfg.isolation.parent_first.iter().cloned()),
        }
    }
}
