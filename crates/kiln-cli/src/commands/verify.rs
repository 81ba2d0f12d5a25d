//! `kiln verify` command.
//!
//! Checks a manifest signature offline, before the manifest is published.

use std::path::Path;

use clap::Args;

use kiln_config::parse_manifest_file;
use kiln_runtime::verify_manifest;

use crate::{output, shared};

/// Verify the signature of a local manifest.
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Path to the manifest JSON file.
    pub path: String,
    /// Base64 X.509 public key, or a file containing one.
    #[arg(long)]
    pub public_key: String,
}

/// Executes the verify command.
///
/// # Errors
///
/// Returns an error if the manifest is invalid or the signature does not
/// verify.
pub fn execute(args: &VerifyArgs) -> anyhow::Result<()> {
    let manifest = parse_manifest_file(Path::new(&args.path))
        .map_err(|e| anyhow::anyhow!("manifest error: {e}"))?;
    let key = shared::resolve_public_key(&args.public_key)?;
    verify_manifest(&manifest, &key).map_err(|e| anyhow::anyhow!("{e}"))?;
    output::print_success(&format!("{manifest}: signature OK"));
    Ok(())
}
