//! # kiln-runtime
//!
//! Secure provider loading for kiln.
//! Fetches a provider manifest, optionally verifies its RSA signature,
//! downloads and caches every artifact by SHA-256, builds an isolated
//! loading boundary over the cached files and discovers the provider
//! implementation inside it.
//!
//! Use `ProviderRuntime::load_provider` for the end-to-end operation; the
//! individual stages are public for hosts that need finer control.

pub mod cache;
pub mod error;
pub mod fingerprint;
pub mod handle;
pub mod integrity;
pub mod manifest_client;
pub mod net;
pub mod orchestrator;
pub mod resolver;
pub mod runtime_config;
pub mod signature;

pub use cache::ArtifactCache;
pub use error::{FailureKind, RuntimeError};
pub use handle::LoadedProvider;
pub use integrity::{compute_file_hash, digest_bytes, digest_matches, digest_reader};
pub use manifest_client::ManifestClient;
pub use net::{Fetch, HttpFetcher, Timeouts};
pub use orchestrator::{Boundary, ProviderRuntime};
pub use resolver::{discover, registered_implementations, ProviderFactories};
pub use runtime_config::RuntimeConfig;
pub use signature::verify_manifest;
