//! Canonical manifest fingerprints.
//!
//! The fingerprint is the payload a publisher signs. It depends only on
//! the manifest's identity and its artifact set, never on declaration
//! order or JSON layout.

use kiln_types::Manifest;

use crate::integrity::digest_bytes;

/// Builds the canonical string `id|version|file:sha:url|...`.
///
/// Artifacts are sorted by file name and their digests lower-cased.
pub fn canonical_string(manifest: &Manifest) -> String {
    let mut artifacts: Vec<_> = manifest.artifacts.iter().collect();
    artifacts.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    let mut out = format!("{}|{}", manifest.id, manifest.version);
    for a in artifacts {
        out.push('|');
        out.push_str(&a.file_name);
        out.push(':');
        out.push_str(&a.sha256.to_ascii_lowercase());
        out.push(':');
        out.push_str(&a.url);
    }
    out
}

/// Computes the hex SHA-256 fingerprint of a manifest.
pub fn compute(manifest: &Manifest) -> String {
    digest_bytes(canonical_string(manifest).as_bytes())
}
