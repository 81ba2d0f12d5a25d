//! Manifest retrieval.

use std::sync::Arc;

use tracing::info;

use kiln_config::{parse_manifest_bytes, parse_manifest_unvalidated, ManifestError};
use kiln_types::Manifest;

use crate::error::RuntimeError;
use crate::net::Fetch;

/// Fetches and parses provider manifests.
pub struct ManifestClient {
    fetcher: Arc<dyn Fetch>,
}

impl ManifestClient {
    /// Creates a client over the given fetcher.
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self { fetcher }
    }

    /// Downloads and validates the manifest at `url`.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Network` when the download fails and
    /// `RuntimeError::Manifest` when the body is not a valid manifest.
    #[tracing::instrument(skip(self))]
    pub fn fetch(&self, url: &str) -> Result<Manifest, RuntimeError> {
        let body = self.fetcher.get(url)?;
        let manifest = parse_manifest_bytes(&body).map_err(|e| manifest_error(url, e))?;
        log_fetched(&manifest);
        Ok(manifest)
    }

    /// Downloads the manifest at `url` and checks that it describes
    /// `expected_id` before validating the rest of it.
    ///
    /// A manifest for the wrong provider is reported as such even when it
    /// is also malformed.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Network` when the download fails,
    /// `RuntimeError::IdentityMismatch` when the id differs, and
    /// `RuntimeError::Manifest` when the body is not a valid manifest.
    #[tracing::instrument(skip(self))]
    pub fn fetch_for(&self, url: &str, expected_id: &str) -> Result<Manifest, RuntimeError> {
        let body = self.fetcher.get(url)?;
        let text = std::str::from_utf8(&body)
            .map_err(|e| manifest_error(url, ManifestError::from(e)))?;
        let manifest = parse_manifest_unvalidated(text).map_err(|e| manifest_error(url, e))?;
        if manifest.id != expected_id {
            return Err(RuntimeError::IdentityMismatch {
                expected: expected_id.to_string(),
                actual: manifest.id,
            });
        }
        manifest
            .validate()
            .map_err(|e| manifest_error(url, ManifestError::Invalid(e.to_string())))?;
        log_fetched(&manifest);
        Ok(manifest)
    }
}

fn manifest_error(url: &str, e: ManifestError) -> RuntimeError {
    RuntimeError::Manifest {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

fn log_fetched(manifest: &Manifest) {
    info!(
        manifest = %manifest,
        artifacts = manifest.artifacts.len(),
        signed = manifest.is_signed(),
        "manifest fetched"
    );
}

impl std::fmt::Debug for ManifestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestClient").finish_non_exhaustive()
    }
}
