//! The disposable handle returned by a successful load.

use std::sync::Arc;

use tracing::info;

use kiln_isolation::IsolatedLoader;
use kiln_types::{KilnError, Manifest, Provider, ProviderConfig, Service};

/// A provider together with the boundary it was loaded in.
///
/// The handle owns the boundary: closing or dropping it closes the loader.
/// Services created through the provider are owned by whoever created them
/// and stay open until their owner closes them.
pub struct LoadedProvider {
    provider: Arc<dyn Provider>,
    loader: Arc<IsolatedLoader>,
    manifest: Manifest,
}

impl LoadedProvider {
    pub(crate) fn new(
        provider: Arc<dyn Provider>,
        loader: Arc<IsolatedLoader>,
        manifest: Manifest,
    ) -> Self {
        Self {
            provider,
            loader,
            manifest,
        }
    }

    /// Returns the provider instance.
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Returns the manifest the provider was loaded from.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Returns the loading boundary.
    pub fn loader(&self) -> &Arc<IsolatedLoader> {
        &self.loader
    }

    /// Creates a new service through the provider.
    ///
    /// # Errors
    ///
    /// Returns an `Unavailable` error once the handle is closed, or the
    /// provider's own error.
    pub fn create_service(&self, config: &ProviderConfig) -> Result<Box<dyn Service>, KilnError> {
        if self.loader.is_closed() {
            return Err(KilnError::unavailable(format!(
                "provider '{}' has been closed",
                self.provider.id()
            )));
        }
        self.provider.create(config)
    }

    /// Closes the loading boundary. Calling it twice is a no-op.
    pub fn close(&mut self) {
        if !self.loader.is_closed() {
            self.loader.close();
            info!(provider = self.provider.id(), manifest = %self.manifest, "provider closed");
        }
    }

    /// Returns `true` once the boundary is closed.
    pub fn is_closed(&self) -> bool {
        self.loader.is_closed()
    }
}

impl Drop for LoadedProvider {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for LoadedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedProvider")
            .field("provider", &self.provider.id())
            .field("manifest", &self.manifest.to_string())
            .field("closed", &self.is_closed())
            .finish()
    }
}
