//! Cache path jail for downloaded artifacts.

use std::path::{Path, PathBuf};

use kiln_types::{is_simple_name, Artifact, Manifest};

use crate::error::IsolationError;

/// Builds `{root}/{id}/{version}/{file_name}` paths and refuses any segment
/// that could step outside `root`.
#[derive(Debug, Clone)]
pub struct ArtifactJail {
    /// Root directory of the cache.
    root: PathBuf,
}

impl ArtifactJail {
    /// Creates a new jail rooted at the given path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the directory holding every artifact of one manifest version.
    pub fn version_dir(&self, manifest: &Manifest) -> Result<PathBuf, IsolationError> {
        let id = checked(&manifest.id)?;
        let version = checked(&manifest.version)?;
        Ok(self.root.join(id).join(version))
    }

    /// Returns the cache path for one artifact of `manifest`.
    pub fn artifact_path(
        &self,
        manifest: &Manifest,
        artifact: &Artifact,
    ) -> Result<PathBuf, IsolationError> {
        let file_name = checked(&artifact.file_name)?;
        Ok(self.version_dir(manifest)?.join(file_name))
    }

    /// Returns the jail root.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn checked(segment: &str) -> Result<&str, IsolationError> {
    if is_simple_name(segment) {
        Ok(segment)
    } else {
        Err(IsolationError::UnsafePath {
            segment: segment.to_string(),
        })
    }
}
