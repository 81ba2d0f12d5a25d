//! `kiln inspect` command.
//!
//! Opens a loading boundary over a manifest's artifacts and lists the
//! provider implementations they register, without instantiating any.

use clap::Args;

use kiln_config::KilnConfig;
use kiln_runtime::registered_implementations;

use crate::{output, shared};

/// Open a loading boundary and list the providers it registers.
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Manifest URL.
    pub url: String,
    /// Provider id the manifest must declare.
    pub id: String,
    /// Base64 X.509 public key, or a file containing one.
    #[arg(long)]
    pub public_key: Option<String>,
}

/// Executes the inspect command.
///
/// # Errors
///
/// Returns an error if the boundary cannot be opened or read.
pub fn execute(args: &InspectArgs, config: &KilnConfig) -> anyhow::Result<()> {
    let key = args
        .public_key
        .as_deref()
        .map(shared::resolve_public_key)
        .transpose()?;
    let runtime = shared::create_runtime(config)?;
    let boundary = runtime
        .open_boundary(&args.url, &args.id, key.as_deref())
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let listed = registered_implementations(&boundary.loader);
    boundary.loader.close();
    let implementations = listed.map_err(|e| anyhow::anyhow!("{e}"))?;

    shared::print_manifest(&boundary.manifest);
    if implementations.is_empty() {
        output::print_warning("no provider implementations registered");
    } else {
        output::print_info(&format!("{} implementation(s):", implementations.len()));
        for name in &implementations {
            println!("    {name}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_manifest_fails() {
        let mut config = KilnConfig::default();
        config.runtime.connect_timeout_ms = 500;
        let args = InspectArgs {
            url: "http://127.0.0.1:1/manifest.json".into(),
            id: "demo".into(),
            public_key: None,
        };
        assert!(execute(&args, &config).is_err());
    }
}
