//! Filesystem catalog scan shared by the `Filesystem` and `Git` backends
//! (a Git working tree is scanned the same way once it's checked out).

use crate::engine::EngineRegistry;
use crate::error::Result;
use crate::reference::{CompleteReference, RawReference};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Walk `root` for `<author>/<name>/<version>.<ext>` leaves. A leaf is
/// cataloged only if its extension has a registered engine.
pub fn scan(root: &Path, repository_url: &str, engines: &EngineRegistry) -> Result<HashMap<CompleteReference, PathBuf>> {
    let mut catalog = HashMap::new();
    if !root.is_dir() {
        return Ok(catalog);
    }

    for entry in WalkDir::new(root).min_depth(3).max_depth(3) {
        let entry = entry.map_err(|e| crate::error::Error::Other(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = match entry.path().strip_prefix(root) {
            Ok(p) => p,
            Err(_) => continue,
        };
        let components: Vec<_> = relative.components().collect();
        if components.len() != 3 {
            continue;
        }

        let extension = match entry.path().extension().and_then(|e| e.to_str()) {
            Some(ext) => ext,
            None => continue,
        };
        if engines.get(extension).is_none() {
            continue;
        }

        let name = components[1].as_os_str().to_string_lossy().to_string();
        let version = entry
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let reference = CompleteReference(RawReference {
            name,
            version: Some(version),
            repository_url: Some(repository_url.to_string()),
            target_app: None,
        });
        catalog.insert(reference, entry.path().to_path_buf());
    }

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineRegistry;
    use std::fs;

    #[test]
    fn scans_author_name_version_layout() {
        let dir = tempfile::tempdir().unwrap();
        let pkg_dir = dir.path().join("acme").join("widget");
        fs::create_dir_all(&pkg_dir).unwrap();
        fs::write(pkg_dir.join("1.0.csup"), "/* uppm 0.0.1 {} */").unwrap();
        fs::write(pkg_dir.join("nightly.ps1"), "<# uppm 0.0.1 {} #>").unwrap();
        fs::write(pkg_dir.join("ignored.txt"), "not a package").unwrap();

        let engines = EngineRegistry::with_builtins();
        let catalog = scan(dir.path(), "file://repo", &engines).unwrap();

        assert_eq!(catalog.len(), 2);
        let names: Vec<_> = catalog.keys().map(|r| r.name().to_string()).collect();
        assert!(names.iter().all(|n| n == "widget"));
    }

    #[test]
    fn missing_root_yields_empty_catalog() {
        let engines = EngineRegistry::with_builtins();
        let catalog = scan(Path::new("/nonexistent/path"), "file://repo", &engines).unwrap();
        assert!(catalog.is_empty());
    }
}
