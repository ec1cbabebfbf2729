//! Repository abstraction (§4.E).
//!
//! A repository is a catalog of packages keyed by [`CompleteReference`],
//! backed either by a local filesystem tree or a Git working tree. The two
//! backends are tagged variants of one enum rather than a trait-object
//! hierarchy (§9): there is no polymorphism a repository backend needs that
//! a `match` can't give more cheaply, and tagged variants make "is this a
//! Git repo" a plain pattern match instead of a downcast.

mod filesystem;
mod git;
mod import_resolver;
mod infer;
mod registry;

pub use git::{Credentials, CertificatePolicy};
pub use import_resolver::RegistryImportResolver;
pub use registry::RepositoryRegistry;

use crate::engine::{EngineRegistry, ScriptEngine};
use crate::error::{Error, Result};
use crate::reference::{CompleteReference, PartialReference};
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Fields shared by every repository backend (§3 "Repository" / common).
#[derive(Debug, Default)]
pub struct RepositoryCommon {
    pub url: String,
    pub ready: bool,
    pub last_refresh_error: Option<String>,
    pub catalog: HashMap<CompleteReference, PathBuf>,
}

impl RepositoryCommon {
    fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ready: false,
            last_refresh_error: None,
            catalog: HashMap::new(),
        }
    }
}

/// A local directory laid out `<author>/<name>/<version>.<ext>`.
#[derive(Debug)]
pub struct FilesystemRepository {
    pub common: RepositoryCommon,
    pub absolute_path: PathBuf,
}

/// A remote Git working tree, synchronized into a caller-provided local
/// checkout folder.
#[derive(Debug)]
pub struct GitRepository {
    pub common: RepositoryCommon,
    pub local_checkout_folder: PathBuf,
    pub certificate_policy: CertificatePolicy,
    pub credentials: Credentials,
    pub custom_headers: Vec<(String, String)>,
    pub remote_reachable: bool,
    pub synchronized: bool,
    fetched_this_process: bool,
}

/// One registered repository. Implements the capability set described in
/// §9 through a `match` on the variant, never through trait dispatch.
#[derive(Debug)]
pub enum Repository {
    Filesystem(FilesystemRepository),
    Git(GitRepository),
}

/// Which backend a URL shape recognizes as (§6 "Repository URL
/// recognition").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryKind {
    Git,
    Filesystem,
}

fn git_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://.*?\.git(?:[?:]|$)").unwrap())
}

/// Classify a URL per §6's recognition rules. Returns `None` if the shape
/// matches neither backend.
pub fn recognize(url: &str) -> Option<RepositoryKind> {
    if git_url_regex().is_match(url) {
        return Some(RepositoryKind::Git);
    }
    let starts_with_drive = {
        let bytes = url.as_bytes();
        bytes.len() >= 2
            && bytes[0].is_ascii_alphabetic()
            && bytes[1] == b':'
            && bytes.get(2).map(|b| *b == b'\\' || b'/' as u8 == *b).unwrap_or(false)
    };
    if url.starts_with(r"\\") || url.starts_with("//") || starts_with_drive {
        return Some(RepositoryKind::Filesystem);
    }
    if url.starts_with('.') || url.starts_with('\\') || url.starts_with('/') {
        return Some(RepositoryKind::Filesystem);
    }
    None
}

impl Repository {
    pub fn new_filesystem(url: impl Into<String>, absolute_path: PathBuf) -> Self {
        let url = url.into();
        Repository::Filesystem(FilesystemRepository {
            common: RepositoryCommon::new(url),
            absolute_path,
        })
    }

    pub fn new_git(url: impl Into<String>, local_checkout_folder: PathBuf) -> Self {
        let url = url.into();
        Repository::Git(GitRepository {
            common: RepositoryCommon::new(url),
            local_checkout_folder,
            certificate_policy: CertificatePolicy::SystemDefault,
            credentials: Credentials::None,
            custom_headers: Vec::new(),
            remote_reachable: false,
            synchronized: false,
            fetched_this_process: false,
        })
    }

    fn common(&self) -> &RepositoryCommon {
        match self {
            Repository::Filesystem(r) => &r.common,
            Repository::Git(r) => &r.common,
        }
    }

    fn common_mut(&mut self) -> &mut RepositoryCommon {
        match self {
            Repository::Filesystem(r) => &mut r.common,
            Repository::Git(r) => &mut r.common,
        }
    }

    pub fn url(&self) -> &str {
        &self.common().url
    }

    pub fn ready(&self) -> bool {
        self.common().ready
    }

    pub fn last_refresh_error(&self) -> Option<&str> {
        self.common().last_refresh_error.as_deref()
    }

    pub fn catalog(&self) -> &HashMap<CompleteReference, PathBuf> {
        &self.common().catalog
    }

    /// URL-only shape check, no I/O.
    pub fn reference_syntactically_valid(&self) -> bool {
        match self {
            Repository::Filesystem(_) => recognize(self.url()) == Some(RepositoryKind::Filesystem),
            Repository::Git(_) => recognize(self.url()) == Some(RepositoryKind::Git),
        }
    }

    /// Active probe: directory existence for filesystem repos, a remote
    /// connect (standing in for the spec's HTTP HEAD, since this crate
    /// reaches Git exclusively through `git2`/libgit2 rather than a
    /// standalone HTTP client) for Git repos.
    pub fn exists(&self) -> bool {
        match self {
            Repository::Filesystem(r) => r.absolute_path.is_dir(),
            Repository::Git(r) => git::probe_remote(self.url(), &r.certificate_policy, &r.credentials).unwrap_or(false),
        }
    }

    /// Rebuild the catalog. Blocking. On failure the repository is left
    /// with `ready = false` and `last_refresh_error` set, but is not
    /// removed from the registry.
    pub fn refresh(&mut self, engines: &EngineRegistry, force_resync: bool) -> Result<()> {
        let result = match self {
            Repository::Filesystem(r) => filesystem::scan(&r.absolute_path, &r.common.url, engines).map(|catalog| {
                r.common.catalog = catalog;
            }),
            Repository::Git(r) => {
                git::sync(r, force_resync).and_then(|_| {
                    filesystem::scan(&r.local_checkout_folder, &r.common.url, engines).map(|catalog| {
                        r.common.catalog = catalog;
                    })
                })
            }
        };

        match result {
            Ok(()) => {
                self.common_mut().ready = true;
                self.common_mut().last_refresh_error = None;
                Ok(())
            }
            Err(e) => {
                self.common_mut().ready = false;
                self.common_mut().last_refresh_error = Some(e.to_string());
                Err(Error::RepositoryRefreshFailed(self.url().to_string(), e.to_string()))
            }
        }
    }

    pub fn try_get_package_text(&self, reference: &CompleteReference) -> Result<String> {
        let path = self
            .catalog()
            .get(reference)
            .ok_or_else(|| Error::PackageNotFound {
                name: reference.name().to_string(),
                repository: self.url().to_string(),
            })?;
        Ok(std::fs::read_to_string(path)?)
    }

    pub fn try_get_script_engine<'a>(&self, reference: &CompleteReference, engines: &'a EngineRegistry) -> Result<&'a dyn ScriptEngine> {
        let path = self
            .catalog()
            .get(reference)
            .ok_or_else(|| Error::PackageNotFound {
                name: reference.name().to_string(),
                repository: self.url().to_string(),
            })?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| Error::EngineUnavailable(String::new()))?;
        engines.get_or_err(extension)
    }

    /// §4.G: complete a partial reference against this repository's
    /// catalog.
    pub fn try_infer_reference(&self, partial: &PartialReference) -> Result<CompleteReference> {
        infer::infer_reference(partial, self.url(), self.catalog())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_git_urls() {
        assert_eq!(recognize("https://example.com/repo.git"), Some(RepositoryKind::Git));
        assert_eq!(recognize("https://example.com/repo.git?x=1"), Some(RepositoryKind::Git));
        assert_eq!(recognize("https://example.com/repo.gitx"), None);
    }

    #[test]
    fn recognizes_filesystem_urls() {
        assert_eq!(recognize(r"\\server\share"), Some(RepositoryKind::Filesystem));
        assert_eq!(recognize("//server/share"), Some(RepositoryKind::Filesystem));
        assert_eq!(recognize(r"C:\repo"), Some(RepositoryKind::Filesystem));
        assert_eq!(recognize("./local"), Some(RepositoryKind::Filesystem));
        assert_eq!(recognize("../local"), Some(RepositoryKind::Filesystem));
    }

    #[test]
    fn unrecognized_urls_return_none() {
        assert_eq!(recognize("ftp://example.com/repo"), None);
    }
}
