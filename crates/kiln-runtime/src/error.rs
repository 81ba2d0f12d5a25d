//! Runtime-specific error types.

use kiln_types::{DiagnosticError, ErrorKind, KilnError};
use thiserror::Error;

/// Boxed underlying cause kept for diagnostics.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by `ProviderRuntime::load_provider` and its stages.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Transport failure or non-2xx HTTP status.
    #[error("network failure for {url}: {detail}")]
    Network {
        url: String,
        status: Option<u16>,
        detail: String,
        #[source]
        source: Option<BoxError>,
    },
    /// The manifest could not be fetched or parsed.
    #[error("invalid manifest at {url}: {reason}")]
    Manifest { url: String, reason: String },
    /// The manifest declares another provider than the caller expects.
    #[error("manifest id mismatch: expected={expected} actual={actual}")]
    IdentityMismatch { expected: String, actual: String },
    /// The manifest signature is missing, undecodable or invalid.
    #[error("manifest signature verification failed (id={id}, version={version}): {detail}")]
    Signature {
        id: String,
        version: String,
        detail: String,
    },
    /// A downloaded artifact does not match its declared digest.
    #[error("sha256 mismatch for {file_name}: expected={expected}, actual={actual}")]
    Integrity {
        file_name: String,
        expected: String,
        actual: String,
    },
    /// The artifact failed verification too many times in a row.
    #[error("giving up on {file_name} after {attempts} consecutive digest mismatches")]
    RedownloadLimit { file_name: String, attempts: u32 },
    /// No discovered provider carries the expected id.
    #[error("provider not found: id={expected}, discovered={discovered:?}")]
    ProviderNotFound {
        expected: String,
        discovered: Vec<String>,
    },
    /// Any other failure, with the operation that raised it.
    #[error("{operation} failed ({context}): {source}")]
    Internal {
        operation: &'static str,
        context: String,
        #[source]
        source: BoxError,
    },
}

/// The failure taxonomy every `RuntimeError` belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Manifest,
    IdentityMismatch,
    Signature,
    Integrity,
    NotFound,
    Runtime,
}

impl RuntimeError {
    /// Builds a network error for a non-2xx response.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::Network {
            url: url.into(),
            status: Some(status),
            detail: format!("HTTP {status}"),
            source: None,
        }
    }

    /// Builds a network error for a transport failure (DNS, TLS, timeout).
    pub fn transport(url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        let source = source.into();
        Self::Network {
            url: url.into(),
            status: None,
            detail: source.to_string(),
            source: Some(source),
        }
    }

    /// Wraps an unexpected failure with the operation name and context.
    pub fn internal(
        operation: &'static str,
        context: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Internal {
            operation,
            context: context.into(),
            source: source.into(),
        }
    }

    /// Returns the taxonomy kind of this error.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Network { .. } => FailureKind::Network,
            Self::Manifest { .. } => FailureKind::Manifest,
            Self::IdentityMismatch { .. } => FailureKind::IdentityMismatch,
            Self::Signature { .. } => FailureKind::Signature,
            Self::Integrity { .. } | Self::RedownloadLimit { .. } => FailureKind::Integrity,
            Self::ProviderNotFound { .. } => FailureKind::NotFound,
            Self::Internal { .. } => FailureKind::Runtime,
        }
    }
}

impl From<RuntimeError> for KilnError {
    fn from(e: RuntimeError) -> Self {
        let kind = match e.failure_kind() {
            FailureKind::Network => ErrorKind::Unavailable,
            FailureKind::Manifest => ErrorKind::InvalidInput,
            FailureKind::IdentityMismatch | FailureKind::Signature => ErrorKind::PermissionDenied,
            FailureKind::Integrity => ErrorKind::Integrity,
            FailureKind::NotFound => ErrorKind::NotFound,
            FailureKind::Runtime => ErrorKind::Internal,
        };
        KilnError::new(kind, e.to_string())
    }
}

impl DiagnosticError for RuntimeError {
    fn hint(&self) -> Option<String> {
        match self {
            Self::Network {
                status: Some(code), ..
            } => Some(format!("The server answered with HTTP {code}.")),
            Self::Network { .. } => {
                Some("The host could not be reached (DNS, TLS, or timeout).".into())
            }
            Self::Manifest { .. } => {
                Some("The manifest is not valid JSON or misses id/version/artifacts.".into())
            }
            Self::IdentityMismatch { expected, actual } => Some(format!(
                "The manifest URL serves '{actual}' but the host asked for '{expected}'."
            )),
            Self::Signature { .. } => Some(
                "The manifest was not signed by the holder of the configured public key.".into(),
            ),
            Self::Integrity { .. } => Some(
                "The downloaded bytes differ from the sha256 declared in the manifest.".into(),
            ),
            Self::RedownloadLimit { .. } => Some(
                "The artifact source keeps serving content that fails verification.".into(),
            ),
            Self::ProviderNotFound { discovered, .. } if discovered.is_empty() => Some(
                "No artifact registers a provider implementation known to this host.".into(),
            ),
            Self::ProviderNotFound { discovered, .. } => Some(format!(
                "Providers found in the artifacts: {}.",
                discovered.join(", ")
            )),
            Self::Internal { .. } => None,
        }
    }

    fn fix(&self) -> Option<String> {
        match self {
            Self::Network { .. } => Some("Check the URL and retry; kiln never retries on its own.".into()),
            Self::IdentityMismatch { .. } => {
                Some("Point the host at the manifest of the provider it expects.".into())
            }
            Self::Signature { .. } => Some(
                "Verify the public key, or set runtime.allow_unsigned = true for development only."
                    .into(),
            ),
            Self::Integrity { .. } | Self::RedownloadLimit { .. } => Some(
                "Republish the artifact or correct its sha256 in the manifest, then retry.".into(),
            ),
            Self::ProviderNotFound { .. } => Some(
                "Check the provider id for typos and that the host registered a factory for it."
                    .into(),
            ),
            _ => None,
        }
    }
}
