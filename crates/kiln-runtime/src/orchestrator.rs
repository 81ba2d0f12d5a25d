//! Top-level runtime orchestrator: manifest, trust, cache, boundary,
//! discovery.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use kiln_isolation::{ArtifactJail, IsolatedLoader, ParentScope};
use kiln_types::Manifest;

use crate::cache::ArtifactCache;
use crate::error::RuntimeError;
use crate::handle::LoadedProvider;
use crate::manifest_client::ManifestClient;
use crate::net::{Fetch, HttpFetcher};
use crate::resolver::{self, ProviderFactories};
use crate::runtime_config::RuntimeConfig;
use crate::signature::{self, UNSIGNED_REFUSED};

/// A verified manifest and the loading boundary built over its artifacts.
///
/// The caller owns the loader and must close it when done.
#[derive(Debug)]
pub struct Boundary {
    /// The verified manifest.
    pub manifest: Manifest,
    /// The boundary over the cached artifacts.
    pub loader: Arc<IsolatedLoader>,
}

/// Loads providers from remote manifests.
///
/// Every call runs the full pipeline; nothing but the on-disk artifact
/// cache is shared between calls, so one runtime can serve many threads.
pub struct ProviderRuntime {
    config: RuntimeConfig,
    manifests: ManifestClient,
    cache: ArtifactCache,
    jail: ArtifactJail,
    host: Arc<dyn ParentScope>,
    factories: ProviderFactories,
}

impl ProviderRuntime {
    /// Creates a runtime that downloads over HTTP.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Internal` if the HTTP client cannot be built.
    pub fn new(
        config: RuntimeConfig,
        host: Arc<dyn ParentScope>,
        factories: ProviderFactories,
    ) -> Result<Self, RuntimeError> {
        let fetcher = Arc::new(HttpFetcher::new(config.timeouts)?);
        Ok(Self::with_fetcher(config, fetcher, host, factories))
    }

    /// Creates a runtime over an existing fetcher.
    pub fn with_fetcher(
        config: RuntimeConfig,
        fetcher: Arc<dyn Fetch>,
        host: Arc<dyn ParentScope>,
        factories: ProviderFactories,
    ) -> Self {
        Self {
            manifests: ManifestClient::new(fetcher.clone()),
            cache: ArtifactCache::new(fetcher, config.max_integrity_failures),
            jail: ArtifactJail::new(config.cache_root.clone()),
            config,
            host,
            factories,
        }
    }

    /// Fetches and parses the manifest at `url` without any trust check.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Network` or `RuntimeError::Manifest`.
    pub fn fetch_manifest(&self, url: &str) -> Result<Manifest, RuntimeError> {
        self.manifests.fetch(url)
    }

    /// Fetches and verifies the manifest, then caches every artifact.
    ///
    /// Returns the manifest and the local artifact paths in declaration
    /// order.
    ///
    /// # Errors
    ///
    /// Returns the first failure of the identity, manifest, signature or
    /// cache stage. The id is compared before the rest of the manifest is
    /// validated, and no artifact is downloaded before the identity and
    /// signature checks pass.
    #[tracing::instrument(skip(self, public_key_base64))]
    pub fn prefetch(
        &self,
        manifest_url: &str,
        expected_id: &str,
        public_key_base64: Option<&str>,
    ) -> Result<(Manifest, Vec<PathBuf>), RuntimeError> {
        let manifest = self.manifests.fetch_for(manifest_url, expected_id)?;
        self.establish_trust(&manifest, public_key_base64)?;
        let paths = self.cache.ensure_all(&self.jail, &manifest)?;
        Ok((manifest, paths))
    }

    /// Runs `prefetch` and builds a loading boundary over the artifacts.
    ///
    /// # Errors
    ///
    /// See [`ProviderRuntime::prefetch`]; additionally returns
    /// `RuntimeError::Internal` if an artifact cannot be opened.
    pub fn open_boundary(
        &self,
        manifest_url: &str,
        expected_id: &str,
        public_key_base64: Option<&str>,
    ) -> Result<Boundary, RuntimeError> {
        let (manifest, paths) = self.prefetch(manifest_url, expected_id, public_key_base64)?;
        let loader = IsolatedLoader::build(
            paths,
            self.host.clone(),
            self.config.parent_first.clone(),
        )
        .map_err(|e| RuntimeError::internal("build_loader", manifest.to_string(), e))?;
        Ok(Boundary {
            manifest,
            loader: Arc::new(loader),
        })
    }

    /// Loads the provider `expected_id` described by the manifest at
    /// `manifest_url`.
    ///
    /// With `public_key_base64` the manifest signature must verify against
    /// it. Without one the load proceeds only when `allow_unsigned` is set.
    ///
    /// # Errors
    ///
    /// Returns the failure of whichever stage failed. A boundary built
    /// before the failure is closed before returning.
    #[tracing::instrument(skip(self, public_key_base64), fields(signed = public_key_base64.is_some()))]
    pub fn load_provider(
        &self,
        manifest_url: &str,
        expected_id: &str,
        public_key_base64: Option<&str>,
    ) -> Result<LoadedProvider, RuntimeError> {
        let Boundary { manifest, loader } =
            self.open_boundary(manifest_url, expected_id, public_key_base64)?;

        match resolver::discover(&loader, expected_id, &self.factories) {
            Ok(provider) => {
                info!(manifest = %manifest, "provider loaded");
                Ok(LoadedProvider::new(provider, loader, manifest))
            }
            Err(e) => {
                loader.close();
                Err(e)
            }
        }
    }

    /// Returns the runtime configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Returns the artifact cache.
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Returns the cache path jail.
    pub fn jail(&self) -> &ArtifactJail {
        &self.jail
    }

    /// Returns the host provider factories.
    pub fn factories(&self) -> &ProviderFactories {
        &self.factories
    }

    fn establish_trust(
        &self,
        manifest: &Manifest,
        public_key_base64: Option<&str>,
    ) -> Result<(), RuntimeError> {
        match public_key_base64 {
            Some(key) => signature::verify_manifest(manifest, key),
            None if self.config.allow_unsigned => {
                warn!(
                    manifest = %manifest,
                    "UNSIGNED MODE: loading manifest without signature verification"
                );
                Ok(())
            }
            None => Err(RuntimeError::Signature {
                id: manifest.id.clone(),
                version: manifest.version.clone(),
                detail: UNSIGNED_REFUSED.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for ProviderRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRuntime")
            .field("config", &self.config)
            .field("factories", &self.factories)
            .finish_non_exhaustive()
    }
}
