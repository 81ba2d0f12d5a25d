//! Shared helpers used across CLI commands.
//!
//! Centralises config loading, key resolution and runtime construction so
//! every command uses the same defaults.

use std::path::Path;
use std::sync::Arc;

use kiln_config::{load_config, KilnConfig};
use kiln_isolation::HostScope;
use kiln_runtime::{ProviderFactories, ProviderRuntime, RuntimeConfig};
use kiln_types::Manifest;

use crate::output;

/// Loads the layered configuration.
///
/// # Errors
///
/// Returns an error if the file or an environment override is invalid.
pub fn load(path: Option<&str>) -> anyhow::Result<KilnConfig> {
    load_config(path).map_err(|e| anyhow::anyhow!("config error: {e}"))
}

/// Accepts a base64 SPKI key or a path to a file holding one.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or is empty.
pub fn resolve_public_key(key_or_path: &str) -> anyhow::Result<String> {
    let path = Path::new(key_or_path);
    if path.is_file() {
        let content = std::fs::read_to_string(path)?.trim().to_string();
        if content.is_empty() {
            anyhow::bail!("empty public key file: {}", path.display());
        }
        return Ok(content);
    }
    Ok(key_or_path.trim().to_string())
}

/// Creates a `ProviderRuntime` from the loaded configuration.
///
/// The CLI hosts no providers of its own: the parent scope and the
/// factory table are empty.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be initialised.
pub fn create_runtime(config: &KilnConfig) -> anyhow::Result<ProviderRuntime> {
    let runtime_config = RuntimeConfig::from(config);
    if runtime_config.allow_unsigned {
        output::print_warning("unsigned manifests are allowed by configuration");
    }
    ProviderRuntime::new(
        runtime_config,
        Arc::new(HostScope::new()),
        ProviderFactories::new(),
    )
    .map_err(|e| anyhow::anyhow!("runtime error: {e}"))
}

/// Prints the fields of a manifest.
pub fn print_manifest(manifest: &Manifest) {
    output::print_field("ID", &manifest.id);
    output::print_field("Version", &manifest.version);
    output::print_field("Signed", if manifest.is_signed() { "yes" } else { "no" });
    if let Some(fp) = &manifest.fingerprint {
        output::print_field("Fingerprint", fp);
    }
    output::print_field("Artifacts", &manifest.artifacts.len().to_string());
    for a in &manifest.artifacts {
        println!("    - {} ({}) {}", a.file_name, &a.sha256[..16], a.url);
    }
}
