//! Manifest loader: turns a JSON manifest document into a `Manifest`.
//!
//! Unknown fields are ignored so that older loaders keep working when
//! publishers add fields. A leading UTF-8 BOM and surrounding whitespace
//! are tolerated.

use std::path::Path;

use kiln_types::Manifest;

/// Error type for manifest parsing failures.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The file could not be read.
    #[error("cannot read manifest at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The document is not valid UTF-8.
    #[error("manifest is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    /// The JSON is malformed or missing required fields.
    #[error("invalid manifest json: {0}")]
    Parse(String),
    /// The manifest parsed but violates a structural invariant.
    #[error("invalid manifest: {0}")]
    Invalid(String),
}

/// Parses a manifest JSON string.
///
/// This is a pure transformation, no filesystem access.
///
/// # Errors
///
/// Returns `ManifestError::Parse` for malformed JSON and
/// `ManifestError::Invalid` if an id, version or artifact file name could
/// not safely be used as a path segment.
pub fn parse_manifest(content: &str) -> Result<Manifest, ManifestError> {
    let manifest = parse_manifest_unvalidated(content)?;
    manifest
        .validate()
        .map_err(|e| ManifestError::Invalid(e.to_string()))?;
    Ok(manifest)
}

/// Decodes a manifest JSON string without the structural checks of
/// [`parse_manifest`].
///
/// Callers that must compare the manifest id first use this and run
/// `Manifest::validate` themselves.
///
/// # Errors
///
/// Returns `ManifestError::Parse` for malformed JSON.
pub fn parse_manifest_unvalidated(content: &str) -> Result<Manifest, ManifestError> {
    let content = content.trim_start_matches('\u{feff}').trim();
    serde_json::from_str(content).map_err(|e| ManifestError::Parse(e.to_string()))
}

/// Parses a manifest from raw downloaded bytes.
///
/// # Errors
///
/// Returns `ManifestError::Encoding` for non-UTF-8 input, otherwise the
/// errors of [`parse_manifest`].
pub fn parse_manifest_bytes(bytes: &[u8]) -> Result<Manifest, ManifestError> {
    parse_manifest(std::str::from_utf8(bytes)?)
}

/// Reads a manifest file from disk and parses it.
///
/// # Errors
///
/// Returns `ManifestError::Io` if the file cannot be read.
pub fn parse_manifest_file(path: &Path) -> Result<Manifest, ManifestError> {
    let bytes = std::fs::read(path).map_err(|e| ManifestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_manifest_bytes(&bytes)
}
