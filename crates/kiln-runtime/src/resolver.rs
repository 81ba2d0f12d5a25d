//! Provider discovery inside a loading boundary.
//!
//! Artifacts announce implementations in a registration resource at
//! `kiln-providers/<capability>`, one implementation unit name per line.
//! The host maps each implementation name to a constructor through
//! `ProviderFactories`; the constructor receives the unit resolved inside
//! the boundary together with the boundary itself.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use kiln_isolation::{IsolatedLoader, UnitRef};
use kiln_types::{KilnError, Provider, PROVIDER_CAPABILITY};

use crate::error::RuntimeError;

/// Directory holding registration resources inside an artifact.
pub const REGISTRATION_DIR: &str = "kiln-providers";

/// Constructs a provider from its implementation unit.
pub type ProviderFactory =
    dyn Fn(&UnitRef, &Arc<IsolatedLoader>) -> Result<Arc<dyn Provider>, KilnError> + Send + Sync;

/// Returns the registration resource path for a capability.
pub fn registration_path(capability: &str) -> String {
    format!("{REGISTRATION_DIR}/{capability}")
}

/// Parses a registration resource.
///
/// Blank lines and `#` comments are skipped; surrounding whitespace is
/// trimmed.
pub fn parse_registration(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Host table of provider constructors keyed by implementation unit name.
#[derive(Clone, Default)]
pub struct ProviderFactories {
    factories: BTreeMap<String, Arc<ProviderFactory>>,
}

impl ProviderFactories {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the constructor for `implementation`, replacing any
    /// previous one.
    pub fn register<F>(&mut self, implementation: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&UnitRef, &Arc<IsolatedLoader>) -> Result<Arc<dyn Provider>, KilnError>
            + Send
            + Sync
            + 'static,
    {
        self.factories
            .insert(implementation.into(), Arc::new(factory));
        self
    }

    /// Returns the constructor for `implementation`.
    pub fn get(&self, implementation: &str) -> Option<&Arc<ProviderFactory>> {
        self.factories.get(implementation)
    }

    /// Returns the registered implementation names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Returns the number of registered constructors.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` if no constructor is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for ProviderFactories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderFactories")
            .field("implementations", &self.names())
            .finish()
    }
}

/// Lists every provider implementation registered in the boundary, in
/// resource order, without duplicates.
///
/// # Errors
///
/// Returns `RuntimeError::Internal` if the loader is closed or an artifact
/// cannot be read.
pub fn registered_implementations(loader: &IsolatedLoader) -> Result<Vec<String>, RuntimeError> {
    let path = registration_path(PROVIDER_CAPABILITY);
    let resources = loader
        .resources(&path)
        .map_err(|e| RuntimeError::internal("discover", path.clone(), e))?;

    let mut names: Vec<String> = Vec::new();
    for resource in resources {
        let text = resource.text().map_err(|e| {
            RuntimeError::internal("discover", format!("{path} in {:?}", resource.origin()), e)
        })?;
        for name in parse_registration(text) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Ok(names)
}

/// Instantiates every registered provider the host knows how to build and
/// returns the first whose `id` equals `expected_id`.
///
/// # Errors
///
/// Returns `RuntimeError::ProviderNotFound` listing the ids that were
/// discovered when none matches, and `RuntimeError::Internal` if an
/// implementation cannot be resolved or constructed.
#[tracing::instrument(skip(loader, factories))]
pub fn discover(
    loader: &Arc<IsolatedLoader>,
    expected_id: &str,
    factories: &ProviderFactories,
) -> Result<Arc<dyn Provider>, RuntimeError> {
    let mut discovered = Vec::new();
    for implementation in registered_implementations(loader)? {
        let Some(factory) = factories.get(&implementation) else {
            warn!(%implementation, "no factory registered for implementation, skipping");
            continue;
        };
        let unit = loader
            .resolve(&implementation)
            .map_err(|e| RuntimeError::internal("discover", implementation.clone(), e))?;
        let provider = factory(&unit, loader)
            .map_err(|e| RuntimeError::internal("provider_construct", implementation.clone(), e))?;

        debug!(%implementation, id = provider.id(), "provider instantiated");
        if provider.id() == expected_id {
            info!(%implementation, id = expected_id, "provider discovered");
            return Ok(provider);
        }
        discovered.push(provider.id().to_string());
    }

    Err(RuntimeError::ProviderNotFound {
        expected: expected_id.to_string(),
        discovered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_path_uses_capability() {
        assert_eq!(
            registration_path(PROVIDER_CAPABILITY),
            "kiln-providers/kiln_types::Provider"
        );
    }

    #[test]
    fn parse_skips_comments_and_blanks() {
        let text = "# providers\n\n  acme::sqlite::SqliteProvider  \nacme::pg::PgProvider # primary\n\t\n";
        assert_eq!(
            parse_registration(text),
            vec!["acme::sqlite::SqliteProvider", "acme::pg::PgProvider"]
        );
    }

    #[test]
    fn parse_empty_resource() {
        assert!(parse_registration("").is_empty());
        assert!(parse_registration("# nothing\n").is_empty());
    }

    #[test]
    fn factories_replace_and_list_sorted() {
        let mut table = ProviderFactories::new();
        assert!(table.is_empty());
        table
            .register("b::B", |_, _| Err(KilnError::internal("b")))
            .register("a::A", |_, _| Err(KilnError::internal("a")))
            .register("b::B", |_, _| Err(KilnError::internal("b2")));
        assert_eq!(table.len(), 2);
        assert_eq!(table.names(), vec!["a::A", "b::B"]);
        assert!(table.get("c::C").is_none());
        assert!(format!("{table:?}").contains("a::A"));
    }
}
