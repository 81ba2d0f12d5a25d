//! The error every kiln crate converts into at its public edge.
//!
//! Crate-local `thiserror` enums keep their detail; `KilnError` is what a
//! provider's `create` returns and what hosts match on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of domain errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A manifest, provider or unit does not exist.
    NotFound,
    /// Trust could not be established (signature, identity).
    PermissionDenied,
    /// A manifest or configuration value is malformed.
    InvalidInput,
    /// A remote endpoint could not be reached, or a provider was closed.
    Unavailable,
    /// Downloaded or cached content does not match its declared digest.
    Integrity,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// Returns `true` for failures a caller may reasonably retry later.
    ///
    /// Trust and input failures never heal by retrying.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Unavailable | Self::Integrity)
    }
}

/// Domain-level error: a kind, a message and an optional location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KilnError {
    pub kind: ErrorKind,
    pub message: String,
    /// Where the failure happened, e.g. `manifest demo@1.0`.
    pub context: Option<String>,
}

impl KilnError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
        }
    }

    /// Attaches the location of the failure.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    /// The provider or endpoint cannot serve the request right now.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl fmt::Display for KilnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, " ({})", ctx)?;
        }
        Ok(())
    }
}

impl std::error::Error for KilnError {}

/// Adds an explanation and a remediation to technical errors.
///
/// The CLI prints both under the error line when present.
pub trait DiagnosticError {
    /// Likely cause, in the user's terms.
    fn hint(&self) -> Option<String> {
        None
    }
    /// A concrete step, usually a config key or a republish.
    fn fix(&self) -> Option<String> {
        None
    }
}
