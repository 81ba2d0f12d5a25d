//! Provider manifest and artifact types.
//!
//! The wire format is JSON with camelCase keys (`fileName`,
//! `signatureBase64`). Parsing lives in `kiln-config::manifest_loader`;
//! these types only carry the data and its structural invariants.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::KilnError;

/// Signed description of a provider's identity, version and artifact set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Manifest identity, normally equal to the provider id.
    pub id: String,
    /// Manifest version, chosen by the publisher.
    pub version: String,
    /// Artifacts in declaration order.
    pub artifacts: Vec<Artifact>,
    /// Base64 signature over the fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_base64: Option<String>,
    /// Publisher-supplied fingerprint. Preferred over a recomputed one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// One downloadable file with a declared SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Simple file name used as the last cache path segment.
    pub file_name: String,
    /// Download location.
    pub url: String,
    /// Lowercase hex SHA-256 of the file content.
    pub sha256: String,
    /// Advisory size in bytes. Never enforced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl Manifest {
    /// Checks the structural invariants a manifest must satisfy before any
    /// of its values are used to build filesystem paths.
    ///
    /// # Errors
    ///
    /// Returns `KilnError` (`InvalidInput`) naming the offending field.
    pub fn validate(&self) -> Result<(), KilnError> {
        if !is_simple_name(&self.id) {
            return Err(KilnError::invalid_input(format!(
                "manifest id '{}' must be a non-empty simple name",
                self.id
            )));
        }
        if !is_simple_name(&self.version) {
            return Err(KilnError::invalid_input(format!(
                "manifest version '{}' must be a non-empty simple name",
                self.version
            )));
        }
        let mut seen = HashSet::new();
        for artifact in &self.artifacts {
            artifact
                .validate()
                .map_err(|e| e.with_context(format!("manifest {self}")))?;
            // Two artifacts with one name would share a cache path.
            if !seen.insert(artifact.file_name.as_str()) {
                return Err(KilnError::invalid_input(format!(
                    "artifact file name '{}' is declared twice",
                    artifact.file_name
                ))
                .with_context(format!("manifest {self}")));
            }
        }
        Ok(())
    }

    /// Returns `true` if the manifest carries a signature.
    pub fn is_signed(&self) -> bool {
        self.signature_base64.is_some()
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

impl Artifact {
    /// Checks the file name and digest shape.
    ///
    /// # Errors
    ///
    /// Returns `KilnError` (`InvalidInput`) if the file name could escape the
    /// cache directory or the digest is not 64 hex characters.
    pub fn validate(&self) -> Result<(), KilnError> {
        if !is_simple_name(&self.file_name) {
            return Err(KilnError::invalid_input(format!(
                "artifact file name '{}' is not a simple name",
                self.file_name
            )));
        }
        if self.sha256.len() != 64 || !self.sha256.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(KilnError::invalid_input(format!(
                "artifact '{}' has malformed sha256 '{}'",
                self.file_name, self.sha256
            )));
        }
        Ok(())
    }
}

/// Returns `true` if `name` can be used as a single path segment:
/// non-empty, not `.` or `..`, and free of separators and NUL bytes.
pub fn is_simple_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
