//! `kiln fingerprint` command.
//!
//! Prints the fingerprint a publisher signs for a local manifest.

use std::path::Path;

use clap::Args;

use kiln_config::parse_manifest_file;
use kiln_runtime::fingerprint;

/// Print the canonical fingerprint of a local manifest.
#[derive(Debug, Args)]
pub struct FingerprintArgs {
    /// Path to the manifest JSON file.
    pub path: String,
    /// Also print the canonical string that is hashed.
    #[arg(long)]
    pub canonical: bool,
}

/// Executes the fingerprint command.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read or is invalid.
pub fn execute(args: &FingerprintArgs) -> anyhow::Result<()> {
    let manifest = parse_manifest_file(Path::new(&args.path))
        .map_err(|e| anyhow::anyhow!("manifest error: {e}"))?;
    if args.canonical {
        println!("{}", fingerprint::canonical_string(&manifest));
    }
    let computed = fingerprint::compute(&manifest);
    println!("{computed}");
    if let Some(published) = &manifest.fingerprint {
        if published != &computed {
            crate::output::print_warning(&format!(
                "manifest carries a different fingerprint: {published}"
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_for_valid_manifest() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, r#"{"id":"demo","version":"1.0","artifacts":[]}"#).expect("write");
        let args = FingerprintArgs {
            path: path.to_str().expect("utf8").into(),
            canonical: true,
        };
        assert!(execute(&args).is_ok());
    }

    #[test]
    fn missing_file_fails() {
        let args = FingerprintArgs {
            path: "/nonexistent/manifest.json".into(),
            canonical: false,
        };
        assert!(execute(&args).is_err());
    }
}
