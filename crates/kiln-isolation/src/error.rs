//! Isolation-specific error types.

use kiln_types::{DiagnosticError, ErrorKind, KilnError};
use thiserror::Error;

/// Errors from building or querying a loading boundary.
#[derive(Debug, Error)]
pub enum IsolationError {
    /// No scope could resolve the unit.
    #[error("unit not found: {name}")]
    NotFound { name: String },
    /// The unit name cannot be mapped to an archive entry.
    #[error("invalid unit name: '{name}'")]
    InvalidName { name: String },
    /// An artifact is not a readable zip archive.
    #[error("invalid artifact archive '{path}': {reason}")]
    InvalidArchive { path: String, reason: String },
    /// An artifact file could not be opened or read.
    #[error("cannot read artifact '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// A manifest value would escape the cache directory.
    #[error("unsafe cache path segment: '{segment}'")]
    UnsafePath { segment: String },
    /// The loader was closed.
    #[error("loader is closed")]
    Closed,
    /// A thread panicked while holding the loader lock.
    #[error("loader state poisoned by a panicked thread")]
    Poisoned,
}

impl From<IsolationError> for KilnError {
    fn from(e: IsolationError) -> Self {
        let kind = match &e {
            IsolationError::NotFound { .. } => ErrorKind::NotFound,
            IsolationError::InvalidName { .. } | IsolationError::UnsafePath { .. } => {
                ErrorKind::InvalidInput
            }
            IsolationError::InvalidArchive { .. } => ErrorKind::Integrity,
            IsolationError::Io { .. } | IsolationError::Closed | IsolationError::Poisoned => {
                ErrorKind::Internal
            }
        };
        KilnError::new(kind, e.to_string())
    }
}

impl DiagnosticError for IsolationError {
    fn hint(&self) -> Option<String> {
        match self {
            Self::NotFound { name } => Some(format!(
                "Neither the provider artifacts nor the host scope contain '{name}'."
            )),
            Self::InvalidArchive { .. } => {
                Some("Provider artifacts must be zip archives.".into())
            }
            Self::UnsafePath { .. } => Some(
                "Manifest ids, versions and artifact file names must be single path segments."
                    .into(),
            ),
            Self::Closed => Some("The loaded provider was closed before this lookup.".into()),
            _ => None,
        }
    }

    fn fix(&self) -> Option<String> {
        match self {
            Self::NotFound { .. } => Some(
                "Bundle the unit in one of the manifest artifacts, or register it in the host scope."
                    .into(),
            ),
            Self::InvalidArchive { .. } => {
                Some("Republish the artifact and update its sha256 in the manifest.".into())
            }
            Self::Closed => Some("Keep the LoadedProvider open while its provider is in use.".into()),
            _ => None,
        }
    }
}
