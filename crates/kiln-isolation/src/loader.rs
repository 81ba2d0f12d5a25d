//! Child-first loading boundary over zip artifacts.
//!
//! Resolution order for a unit name:
//! 1. parent-first prefixes go to the parent scope unconditionally;
//! 2. the loader's own resolved-unit cache;
//! 3. the artifacts, in declaration order (first hit wins, then cached);
//! 4. the parent scope, so providers can reach host units they do not bundle.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::IsolationError;
use crate::policy::ParentFirstPolicy;
use crate::scope::{entry_path, Origin, ParentScope, Unit, UnitRef};

/// An open artifact archive.
struct ArchiveHandle {
    path: PathBuf,
    archive: ZipArchive<File>,
}

/// Mutable loader state, guarded by one lock.
struct LoaderState {
    /// `None` once the loader is closed; dropping the handles closes the files.
    archives: Option<Vec<ArchiveHandle>>,
    resolved: HashMap<String, UnitRef>,
}

/// A module-resolution boundary over a fixed set of artifact files.
pub struct IsolatedLoader {
    paths: Vec<PathBuf>,
    parent: Arc<dyn ParentScope>,
    policy: ParentFirstPolicy,
    state: Mutex<LoaderState>,
}

impl IsolatedLoader {
    /// Opens every artifact and builds the boundary.
    ///
    /// # Errors
    ///
    /// Returns `IsolationError::Io` if a file cannot be opened and
    /// `IsolationError::InvalidArchive` if it is not a zip archive. Files
    /// opened before the failure are closed again.
    pub fn build<I, P>(
        artifacts: I,
        parent: Arc<dyn ParentScope>,
        policy: ParentFirstPolicy,
    ) -> Result<Self, IsolationError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut paths = Vec::new();
        let mut archives = Vec::new();
        for path in artifacts {
            let path = path.into();
            archives.push(open_archive(&path)?);
            paths.push(path);
        }
        info!(artifacts = paths.len(), "isolated loader built");
        Ok(Self {
            paths,
            parent,
            policy,
            state: Mutex::new(LoaderState {
                archives: Some(archives),
                resolved: HashMap::new(),
            }),
        })
    }

    /// Resolves a unit by name.
    ///
    /// # Errors
    ///
    /// Returns `IsolationError::NotFound` if no scope defines the unit,
    /// `IsolationError::Closed` after `close`, and archive errors if an
    /// artifact entry cannot be read.
    pub fn resolve(&self, name: &str) -> Result<UnitRef, IsolationError> {
        if self.policy.is_parent_first(name) {
            self.ensure_open()?;
            debug!(unit = name, "parent-first");
            return self.from_parent(name);
        }

        let entry = entry_path(name).ok_or_else(|| IsolationError::InvalidName {
            name: name.to_string(),
        })?;

        {
            let mut state = self.lock()?;
            if let Some(unit) = state.resolved.get(name) {
                return Ok(unit.clone());
            }
            let LoaderState { archives, resolved } = &mut *state;
            let archives = archives.as_mut().ok_or(IsolationError::Closed)?;
            for handle in archives.iter_mut() {
                if let Some(bytes) = read_entry(handle, &entry)? {
                    debug!(unit = name, artifact = %handle.path.display(), "resolved from artifact");
                    let unit = Arc::new(Unit::new(name, Origin::Artifact(handle.path.clone()), bytes));
                    resolved.insert(name.to_string(), unit.clone());
                    return Ok(unit);
                }
            }
        }

        debug!(unit = name, "not bundled, delegating to parent");
        self.from_parent(name)
    }

    /// Returns every resource stored at the raw entry `path`, parent scope
    /// first, then artifacts in declaration order.
    ///
    /// # Errors
    ///
    /// Returns `IsolationError::Closed` after `close`, or an archive error.
    pub fn resources(&self, path: &str) -> Result<Vec<UnitRef>, IsolationError> {
        self.ensure_open()?;
        let mut found = self.parent.resources(path);

        let mut state = self.lock()?;
        let archives = state.archives.as_mut().ok_or(IsolationError::Closed)?;
        for handle in archives.iter_mut() {
            if let Some(bytes) = read_entry(handle, path)? {
                found.push(Arc::new(Unit::new(
                    path,
                    Origin::Artifact(handle.path.clone()),
                    bytes,
                )));
            }
        }
        Ok(found)
    }

    /// Releases every artifact file handle and the resolved-unit cache.
    ///
    /// Safe to call more than once.
    pub fn close(&self) {
        // A poisoned lock still holds valid handles; release them anyway.
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if state.archives.take().is_some() {
            state.resolved.clear();
            info!(artifacts = self.paths.len(), "isolated loader closed");
        }
    }

    /// Returns `true` once `close` has run.
    pub fn is_closed(&self) -> bool {
        match self.state.lock() {
            Ok(state) => state.archives.is_none(),
            Err(poisoned) => poisoned.into_inner().archives.is_none(),
        }
    }

    /// Returns the artifact files backing this loader.
    pub fn artifact_paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Returns the parent-first policy in effect.
    pub fn policy(&self) -> &ParentFirstPolicy {
        &self.policy
    }

    fn from_parent(&self, name: &str) -> Result<UnitRef, IsolationError> {
        self.parent
            .resolve(name)
            .ok_or_else(|| IsolationError::NotFound {
                name: name.to_string(),
            })
    }

    fn ensure_open(&self) -> Result<(), IsolationError> {
        if self.lock()?.archives.is_none() {
            return Err(IsolationError::Closed);
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, LoaderState>, IsolationError> {
        self.state.lock().map_err(|_| IsolationError::Poisoned)
    }
}

impl std::fmt::Debug for IsolatedLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsolatedLoader")
            .field("paths", &self.paths)
            .field("policy", &self.policy)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn open_archive(path: &Path) -> Result<ArchiveHandle, IsolationError> {
    let file = File::open(path).map_err(|e| IsolationError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let archive = ZipArchive::new(file).map_err(|e| IsolationError::InvalidArchive {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(ArchiveHandle {
        path: path.to_path_buf(),
        archive,
    })
}

/// Largest buffer reserved up front for an entry; bigger entries grow as
/// they are read.
const MAX_PREALLOC: u64 = 1 << 20;

/// Buffer size to reserve for an entry whose header claims `declared` bytes.
/// The header is untrusted, so the reservation is capped.
fn initial_capacity(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOC)).unwrap_or(0)
}

/// Reads one file entry; `Ok(None)` if the archive does not contain it.
fn read_entry(handle: &mut ArchiveHandle, entry: &str) -> Result<Option<Vec<u8>>, IsolationError> {
    let ArchiveHandle { path, archive } = handle;
    let mut file = match archive.by_name(entry) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(IsolationError::InvalidArchive {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        }
    };
    if file.is_dir() {
        return Ok(None);
    }
    let mut buf = Vec::with_capacity(initial_capacity(file.size()));
    file.read_to_end(&mut buf).map_err(|e| IsolationError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(buf))
}
