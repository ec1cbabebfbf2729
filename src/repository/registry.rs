//! Repository registry (§4.F): the *default*, *present*, and *known-types*
//! mappings, and the probe sequence that picks a backend for an unknown
//! URL.

use super::git::derive_checkout_folder;
use super::{recognize, Repository, RepositoryKind};
use crate::engine::EngineRegistry;
use crate::error::{Error, Result};
use crate::reference::{CompleteReference, PartialReference};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

/// Repositories are process-wide singletons indexed by URL (§3
/// "Lifecycle"); `Rc<RefCell<_>>` gives every holder of a handle a live
/// view of the same mutable catalog/readiness state within this
/// single-threaded core.
pub type RepositoryHandle = Rc<RefCell<Repository>>;

pub struct RepositoryRegistry {
    default: HashMap<String, RepositoryHandle>,
    present: HashMap<String, RepositoryHandle>,
    git_checkout_root: PathBuf,
    force_resync: bool,
}

impl RepositoryRegistry {
    pub fn new(git_checkout_root: PathBuf) -> Self {
        Self {
            default: HashMap::new(),
            present: HashMap::new(),
            git_checkout_root,
            force_resync: false,
        }
    }

    pub fn set_force_resync(&mut self, force: bool) {
        self.force_resync = force;
    }

    /// Register a repository as a default (e.g. a target app's
    /// `default_repository`). Replaces any existing default for the same
    /// URL.
    pub fn register_default(&mut self, repository: Repository) -> RepositoryHandle {
        let url = repository.url().to_string();
        let handle = Rc::new(RefCell::new(repository));
        self.default.insert(url, handle.clone());
        handle
    }

    /// Remove a URL from the default set (used by `TargetApp::set_current`
    /// when swapping the active target app, §4.H).
    pub fn unregister_default(&mut self, url: &str) -> Option<RepositoryHandle> {
        self.default.remove(url)
    }

    pub fn defaults(&self) -> impl Iterator<Item = &RepositoryHandle> {
        self.default.values()
    }

    fn instantiate(&self, url: &str, kind: RepositoryKind) -> Repository {
        match kind {
            RepositoryKind::Filesystem => Repository::new_filesystem(url, PathBuf::from(url)),
            RepositoryKind::Git => {
                let checkout = derive_checkout_folder(&self.git_checkout_root, url);
                Repository::new_git(url, checkout)
            }
        }
    }

    /// §4.F `get_or_create`: default, then present, then probe each known
    /// backend kind in recognition order (Git before Filesystem, matching
    /// this module's declaration order) and register the first that
    /// proves syntactically valid and reachable.
    pub fn get_or_create(&mut self, url: &str, engines: &EngineRegistry) -> Result<RepositoryHandle> {
        if let Some(handle) = self.default.get(url) {
            return Ok(handle.clone());
        }
        if let Some(handle) = self.present.get(url) {
            return Ok(handle.clone());
        }

        let kind = recognize(url).ok_or_else(|| Error::RepositoryNotFound(url.to_string()))?;
        let candidate = self.instantiate(url, kind);
        if !candidate.reference_syntactically_valid() || !candidate.exists() {
            return Err(Error::RepositoryNotFound(url.to_string()));
        }

        let handle = Rc::new(RefCell::new(candidate));
        handle.borrow_mut().refresh(engines, self.force_resync)?;
        self.present.insert(url.to_string(), handle.clone());
        Ok(handle)
    }

    /// `get_or_create`, then also add the URL to the *default* set — used
    /// when a target app becomes current (§4.H `set_current`).
    pub fn promote_to_default(&mut self, url: &str, engines: &EngineRegistry) -> Result<RepositoryHandle> {
        let handle = self.get_or_create(url, engines)?;
        self.default.insert(url.to_string(), handle.clone());
        Ok(handle)
    }

    /// When a partial reference carries no `repository_url`, probe every
    /// default repository's package text; the first non-empty body wins.
    pub fn resolve_without_repository(&self, partial: &PartialReference) -> Result<(RepositoryHandle, CompleteReference)> {
        for handle in self.default.values() {
            let repo = handle.borrow();
            if let Ok(complete) = repo.try_infer_reference(partial) {
                if repo.try_get_package_text(&complete).map(|t| !t.is_empty()).unwrap_or(false) {
                    drop(repo);
                    return Ok((handle.clone(), complete));
                }
            }
        }
        Err(Error::PackageNotFound {
            name: partial.name().to_string(),
            repository: "<default repositories>".to_string(),
        })
    }
}
