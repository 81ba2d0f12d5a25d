//! # kiln-config
//!
//! Configuration management for kiln.
//! Supports layered config: defaults -> file -> env vars.
//! Also owns manifest document parsing, keeping `serde_json` and file I/O
//! out of the domain crate.

pub mod loader;
pub mod manifest_loader;
pub mod schema;

pub use loader::{load_config, ConfigError};
pub use manifest_loader::{
    parse_manifest, parse_manifest_bytes, parse_manifest_file, parse_manifest_unvalidated,
    ManifestError,
};
pub use schema::KilnConfig;
