//! Content-verified artifact cache.
//!
//! A cached file is trusted only while its SHA-256 matches the manifest.
//! Downloads land in a unique sibling temp file and are renamed onto the
//! final path only after verification, so the final path never holds
//! unverified bytes.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tempfile::{Builder, NamedTempFile};
use tracing::{debug, info, warn};

use kiln_isolation::ArtifactJail;
use kiln_types::{Artifact, Manifest};

use crate::error::RuntimeError;
use crate::integrity::{compute_file_hash, digest_bytes, digest_matches};
use crate::net::Fetch;

/// Ensures artifacts exist locally with their declared digest.
///
/// Consecutive digest mismatches are counted per target path; once the
/// count reaches `max_integrity_failures` further downloads of that target
/// are refused until a success or `reset_failures`. A limit of 0 disables
/// the bound.
pub struct ArtifactCache {
    fetcher: Arc<dyn Fetch>,
    max_integrity_failures: u32,
    failures: Mutex<HashMap<PathBuf, u32>>,
}

impl ArtifactCache {
    /// Creates a cache that downloads through `fetcher`.
    pub fn new(fetcher: Arc<dyn Fetch>, max_integrity_failures: u32) -> Self {
        Self {
            fetcher,
            max_integrity_failures,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Makes `target` hold exactly the bytes `artifact.sha256` names.
    ///
    /// A matching file is a cache hit and costs no network request. A
    /// mismatching one is deleted and downloaded again.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Network` if the download fails,
    /// `RuntimeError::Integrity` if the downloaded bytes mismatch,
    /// `RuntimeError::RedownloadLimit` once the failure budget is spent, and
    /// `RuntimeError::Internal` for local I/O failures.
    #[tracing::instrument(skip(self, artifact), fields(file = %artifact.file_name))]
    pub fn ensure(&self, artifact: &Artifact, target: &Path) -> Result<(), RuntimeError> {
        // Another `ensure` on the same target may evict it at any point, so a
        // file vanishing under us counts as absent.
        match compute_file_hash(target) {
            Ok(actual) if digest_matches(&actual, &artifact.sha256) => {
                debug!("cache hit");
                return Ok(());
            }
            Ok(actual) => {
                warn!(expected = %artifact.sha256, %actual, "cached artifact corrupted, redownloading");
                match fs::remove_file(target) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(RuntimeError::internal(
                            "cache_evict",
                            target.display().to_string(),
                            e,
                        ))
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(RuntimeError::internal(
                    "cache_read",
                    target.display().to_string(),
                    e,
                ))
            }
        }

        let attempts = self.failure_count(target);
        if self.max_integrity_failures > 0 && attempts >= self.max_integrity_failures {
            return Err(RuntimeError::RedownloadLimit {
                file_name: artifact.file_name.clone(),
                attempts,
            });
        }

        let dir = target.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)
            .map_err(|e| RuntimeError::internal("cache_mkdir", dir.display().to_string(), e))?;

        let bytes = self.fetcher.get(&artifact.url)?;
        let tmp = write_temp(dir, &artifact.file_name, &bytes)?;

        let actual = digest_bytes(&bytes);
        if !digest_matches(&actual, &artifact.sha256) {
            let attempts = self.record_failure(target);
            warn!(expected = %artifact.sha256, %actual, attempts, "downloaded artifact rejected");
            // Dropping `tmp` deletes the rejected bytes.
            return Err(RuntimeError::Integrity {
                file_name: artifact.file_name.clone(),
                expected: artifact.sha256.clone(),
                actual,
            });
        }

        persist(tmp, target)?;
        self.clear_failures(target);
        info!(bytes = bytes.len(), path = %target.display(), "artifact cached");
        Ok(())
    }

    /// Ensures every artifact of `manifest` under `jail`, in declaration
    /// order, and returns their local paths in the same order.
    ///
    /// # Errors
    ///
    /// Stops at the first artifact that fails; see [`ArtifactCache::ensure`].
    pub fn ensure_all(
        &self,
        jail: &ArtifactJail,
        manifest: &Manifest,
    ) -> Result<Vec<PathBuf>, RuntimeError> {
        let mut paths = Vec::with_capacity(manifest.artifacts.len());
        for artifact in &manifest.artifacts {
            let path = jail.artifact_path(manifest, artifact).map_err(|e| {
                RuntimeError::internal("cache_path", manifest.to_string(), e)
            })?;
            self.ensure(artifact, &path)?;
            paths.push(path);
        }
        Ok(paths)
    }

    /// Returns the consecutive digest mismatches recorded for `target`.
    pub fn failure_count(&self, target: &Path) -> u32 {
        self.failures().get(target).copied().unwrap_or(0)
    }

    /// Forgets every recorded mismatch.
    pub fn reset_failures(&self) {
        self.failures().clear();
    }

    fn record_failure(&self, target: &Path) -> u32 {
        let mut failures = self.failures();
        let count = failures.entry(target.to_path_buf()).or_insert(0);
        *count += 1;
        *count
    }

    fn clear_failures(&self, target: &Path) {
        self.failures().remove(target);
    }

    fn failures(&self) -> MutexGuard<'_, HashMap<PathBuf, u32>> {
        // The map is plain counters; a panic elsewhere cannot corrupt it.
        self.failures
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ArtifactCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCache")
            .field("max_integrity_failures", &self.max_integrity_failures)
            .finish_non_exhaustive()
    }
}

fn write_temp(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<NamedTempFile, RuntimeError> {
    let io_err = |e: std::io::Error| {
        RuntimeError::internal("cache_write", dir.join(file_name).display().to_string(), e)
    };
    let mut tmp = Builder::new()
        .prefix(&format!("{file_name}."))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    Ok(tmp)
}

/// Renames the temp file onto `target`, copying when rename is refused.
fn persist(tmp: NamedTempFile, target: &Path) -> Result<(), RuntimeError> {
    match tmp.persist(target) {
        Ok(_) => Ok(()),
        Err(e) => {
            warn!(error = %e.error, "atomic rename failed, copying instead");
            // `e.file` still owns the temp path and removes it on drop.
            copy_into_place(e.file.path(), target)
        }
    }
}

/// Copies `src` onto `target`. A failed copy leaves no file at `target`.
fn copy_into_place(src: &Path, target: &Path) -> Result<(), RuntimeError> {
    if let Err(err) = fs::copy(src, target) {
        if let Err(cleanup) = fs::remove_file(target) {
            if cleanup.kind() != io::ErrorKind::NotFound {
                warn!(error = %cleanup, path = %target.display(), "could not remove partial copy");
            }
        }
        return Err(RuntimeError::internal(
            "cache_persist",
            target.display().to_string(),
            err,
        ));
    }
    Ok(())
}
