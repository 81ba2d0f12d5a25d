//! # kiln-isolation
//!
//! Loading boundaries for provider artifacts.
//! An `IsolatedLoader` resolves named units from a fixed set of local zip
//! artifacts, child-first, while a parent-first allow-list keeps the shared
//! contract (and the host runtime) resolving from the single host copy.
//!
//! Two loaders built over conflicting dependency versions never see each
//! other's units, yet both hand out the same `Arc` for every shared unit.

pub mod error;
pub mod jail;
pub mod loader;
pub mod policy;
pub mod scope;

pub use error::IsolationError;
pub use jail::ArtifactJail;
pub use loader::IsolatedLoader;
pub use policy::{ParentFirstPolicy, DEFAULT_PARENT_FIRST};
pub use scope::{entry_path, HostScope, Origin, ParentScope, Unit, UnitRef};
