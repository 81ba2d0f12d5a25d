//! Resolution scopes and the units they hand out.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Where a unit was resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// The host (parent) scope.
    Parent,
    /// A provider artifact on disk.
    Artifact(PathBuf),
}

/// A named entry resolved through a scope.
///
/// Units are shared as `UnitRef`; two `UnitRef`s denote the same unit
/// exactly when `Arc::ptr_eq` holds.
#[derive(Debug)]
pub struct Unit {
    name: String,
    origin: Origin,
    bytes: Vec<u8>,
}

/// Shared handle to a resolved unit.
pub type UnitRef = Arc<Unit>;

impl Unit {
    /// Creates a new unit.
    pub fn new(name: impl Into<String>, origin: Origin, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            origin,
            bytes: bytes.into(),
        }
    }

    /// Returns the unit name (`acme::sqlite::Driver`) or resource path.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns where the unit came from.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Returns the raw unit content.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the content as UTF-8 text.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.bytes)
    }
}

/// Maps a unit name to its archive entry path: `a::b::C` -> `a/b/C`.
///
/// Returns `None` for names that are empty, have empty segments, or
/// contain characters that would change the entry path meaning.
pub fn entry_path(name: &str) -> Option<String> {
    let segments: Vec<&str> = name.split("::").collect();
    let valid = segments.iter().all(|s| {
        !s.is_empty() && *s != "." && *s != ".." && !s.contains(['/', '\\', ':', '\0'])
    });
    valid.then(|| segments.join("/"))
}

/// The enclosing scope a loader delegates to.
pub trait ParentScope: Send + Sync {
    /// Resolves a unit by name, if this scope defines it.
    fn resolve(&self, name: &str) -> Option<UnitRef>;

    /// Returns every resource this scope holds at `path`.
    fn resources(&self, _path: &str) -> Vec<UnitRef> {
        Vec::new()
    }
}

/// In-process host scope populated by the host application.
///
/// Every unit is created once and shared, so all loaders that delegate to
/// the same `HostScope` observe one identity per unit.
#[derive(Debug, Default, Clone)]
pub struct HostScope {
    units: HashMap<String, UnitRef>,
    resources: HashMap<String, Vec<UnitRef>>,
}

impl HostScope {
    /// Creates an empty host scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unit.
    pub fn with_unit(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        let unit = Arc::new(Unit::new(name.clone(), Origin::Parent, bytes));
        self.units.insert(name, unit);
        self
    }

    /// Registers a resource. Several resources may share one path.
    pub fn with_resource(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let path = path.into();
        let unit = Arc::new(Unit::new(path.clone(), Origin::Parent, bytes));
        self.resources.entry(path).or_default().push(unit);
        self
    }

    /// Returns the number of registered units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if no unit is registered.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl ParentScope for HostScope {
    fn resolve(&self, name: &str) -> Option<UnitRef> {
        self.units.get(name).cloned()
    }

    fn resources(&self, path: &str) -> Vec<UnitRef> {
        self.resources.get(path).cloned().unwrap_or_default()
    }
}
