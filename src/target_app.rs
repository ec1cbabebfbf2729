//! Target-app registry (§4.H): where installed packages live, and the two
//! operations the dependency resolver needs from it during reconciliation.

use crate::engine::EngineRegistry;
use crate::error::{Error, Result};
use crate::reference::{CompleteReference, PartialReference, RawReference};
use crate::repository::RepositoryRegistry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Which pack folder an installed package lives in. Declared as a plain
/// enum rather than a bitflag: §9 notes the only consumer ever queries one
/// scope at a time, so a union-of-scopes query has no real caller here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstalledScope {
    Global,
    Local,
}

/// A registered application uppm can install packages into.
#[derive(Debug, Clone)]
pub struct TargetApp {
    pub short_name: String,
    pub architecture: String,
    pub app_folder: PathBuf,
    pub global_packs_folder: PathBuf,
    pub local_packs_folder: PathBuf,
    pub executable: PathBuf,
    pub default_repository_url: String,
}

impl TargetApp {
    fn packs_folder(&self, scope: InstalledScope) -> &Path {
        match scope {
            InstalledScope::Global => &self.global_packs_folder,
            InstalledScope::Local => &self.local_packs_folder,
        }
    }

    /// Enumerate installed packages in `scope`'s pack folder, laid out
    /// `<name>/<version>.<ext>` (one level shallower than a repository
    /// catalog, since an install target has no `<author>` segment).
    pub fn enumerate_installed(&self, scope: InstalledScope) -> Vec<CompleteReference> {
        let root = self.packs_folder(scope);
        let mut out = Vec::new();
        if !root.is_dir() {
            return out;
        }
        for entry in WalkDir::new(root).min_depth(2).max_depth(2) {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = match entry.path().strip_prefix(root) {
                Ok(p) => p,
                Err(_) => continue,
            };
            let mut components = relative.components();
            let Some(name_component) = components.next() else { continue };
            let name = name_component.as_os_str().to_string_lossy().to_string();
            let version = entry
                .path()
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();

            out.push(CompleteReference(RawReference {
                name,
                version: Some(version),
                repository_url: Some(self.default_repository_url.clone()),
                target_app: Some(self.short_name.clone()),
            }));
        }
        out
    }

    /// Short-circuiting fold: the first installed package whose name
    /// matches `partial` (case-insensitively), in `scope`.
    pub fn try_get_installed_package(&self, partial: &PartialReference, scope: InstalledScope) -> Option<CompleteReference> {
        self.enumerate_installed(scope)
            .into_iter()
            .find(|installed| installed.name().eq_ignore_ascii_case(partial.name()))
    }
}

pub struct TargetAppRegistry {
    apps: HashMap<String, TargetApp>,
    current: Option<String>,
}

impl TargetAppRegistry {
    pub fn new() -> Self {
        Self {
            apps: HashMap::new(),
            current: None,
        }
    }

    pub fn register(&mut self, app: TargetApp) {
        self.apps.insert(app.short_name.clone(), app);
    }

    pub fn get(&self, short_name: &str) -> Result<&TargetApp> {
        self.apps
            .get(short_name)
            .ok_or_else(|| Error::UnknownTargetApp(short_name.to_string()))
    }

    pub fn current(&self) -> Option<&TargetApp> {
        self.current.as_ref().and_then(|name| self.apps.get(name))
    }

    /// Swap the active target app: the previous app's default repository
    /// is removed from the repository registry's default set, and the new
    /// one is registered and refreshed.
    pub fn set_current(&mut self, short_name: &str, repositories: &mut RepositoryRegistry, engines: &EngineRegistry) -> Result<()> {
        if !self.apps.contains_key(short_name) {
            return Err(Error::UnknownTargetApp(short_name.to_string()));
        }

        if let Some(previous_name) = &self.current {
            if let Some(previous) = self.apps.get(previous_name) {
                repositories.unregister_default(&previous.default_repository_url);
            }
        }

        let app = &self.apps[short_name];
        repositories.promote_to_default(&app.default_repository_url, engines)?;
        self.current = Some(short_name.to_string());
        Ok(())
    }
}

impl Default for TargetAppRegistry {
    fn default() -> Self {
        Self::new()
    }
}
