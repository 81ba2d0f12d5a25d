//! The contract exchanged across an isolation boundary.
//!
//! A provider is created inside its own boundary and handed back to the
//! host as `Arc<dyn Provider>`. Both sides see the same trait objects
//! because this crate is always resolved from the host scope.

use std::collections::BTreeMap;

use crate::error::KilnError;

/// Capability name under which provider implementations are registered.
pub const PROVIDER_CAPABILITY: &str = "kiln_types::Provider";

/// A discoverable implementation that issues service instances.
pub trait Provider: Send + Sync {
    /// Unique provider identifier (e.g. `sqlite`).
    fn id(&self) -> &str;

    /// Creates and initializes a new service instance.
    ///
    /// The returned service is owned by the caller, not by the loaded
    /// provider, and must be closed by its owner.
    ///
    /// # Errors
    ///
    /// Returns `KilnError` if the configuration is rejected or the service
    /// cannot be initialized.
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn Service>, KilnError>;
}

/// A service instance issued by a provider.
pub trait Service: Send {
    /// Identifier of the provider that issued this service.
    fn provider_id(&self) -> &str;

    /// Releases everything the service holds. Calling it twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `KilnError` if releasing an underlying resource fails.
    fn close(&mut self) -> Result<(), KilnError>;

    /// Returns `true` once `close` has completed.
    fn is_closed(&self) -> bool;
}

/// Provider-agnostic service configuration.
///
/// Carries plain strings only; provider-specific types never cross the
/// boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Root namespace the provider scans for entities, if any.
    pub entity_namespace: Option<String>,
    /// Entity unit names registered explicitly by the host.
    pub extra_entities: Vec<String>,
    /// Provider-specific key/value settings.
    pub settings: BTreeMap<String, String>,
}

impl ProviderConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a single setting, replacing any previous value.
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Sets the entity namespace.
    pub fn with_entity_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.entity_namespace = Some(namespace.into());
        self
    }

    /// Adds an explicitly registered entity.
    pub fn with_extra_entity(mut self, name: impl Into<String>) -> Self {
        self.extra_entities.push(name.into());
        self
    }

    /// Returns a setting by key.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }
}
