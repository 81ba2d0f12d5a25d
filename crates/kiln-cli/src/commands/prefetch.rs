//! `kiln prefetch` command.
//!
//! Warms the artifact cache so later loads need only the manifest.

use clap::Args;

use kiln_config::KilnConfig;

use crate::{output, shared};

/// Download and verify every artifact of a manifest into the cache.
#[derive(Debug, Args)]
pub struct PrefetchArgs {
    /// Manifest URL.
    pub url: String,
    /// Provider id the manifest must declare.
    pub id: String,
    /// Base64 X.509 public key, or a file containing one.
    #[arg(long)]
    pub public_key: Option<String>,
}

/// Executes the prefetch command.
///
/// # Errors
///
/// Returns an error if any stage of the pipeline fails.
pub fn execute(args: &PrefetchArgs, config: &KilnConfig) -> anyhow::Result<()> {
    let key = args
        .public_key
        .as_deref()
        .map(shared::resolve_public_key)
        .transpose()?;
    let runtime = shared::create_runtime(config)?;
    let (manifest, paths) = runtime
        .prefetch(&args.url, &args.id, key.as_deref())
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    output::print_success(&format!("{manifest}: {} artifact(s) cached", paths.len()));
    for path in &paths {
        println!("    {}", path.display());
    }
    Ok(())
}
