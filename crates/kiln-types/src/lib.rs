//! # kiln-types
//!
//! Domain types for kiln.
//! Holds the manifest data model, the domain error, and the contract
//! shared between the host and every provider it loads. Types in this
//! crate are resolved parent-first by every isolated loader, so there is
//! exactly one copy of them in a process.

pub mod contract;
pub mod error;
pub mod manifest;

// Re-exports for convenience.
pub use contract::{Provider, ProviderConfig, Service, PROVIDER_CAPABILITY};
pub use error::{DiagnosticError, ErrorKind, KilnError};
pub use manifest::{is_simple_name, Artifact, Manifest};
