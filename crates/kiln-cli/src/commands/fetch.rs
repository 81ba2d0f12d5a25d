//! `kiln fetch` command.

use clap::Args;

use kiln_config::KilnConfig;

use crate::{output, shared};

/// Fetch a manifest and print its contents.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Manifest URL.
    pub url: String,
}

/// Executes the fetch command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be downloaded or parsed.
pub fn execute(args: &FetchArgs, config: &KilnConfig) -> anyhow::Result<()> {
    let runtime = shared::create_runtime(config)?;
    let manifest = runtime
        .fetch_manifest(&args.url)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    output::print_success(&format!("fetched {manifest}"));
    shared::print_manifest(&manifest);
    Ok(())
}
