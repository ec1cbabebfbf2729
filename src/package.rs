//! Package metadata and the package loader (§4.I): combining the script
//! engine registry (D), a repository (E), and the metadata extractor (C)
//! into a loaded package ready for the resolver to place in the tree.

use crate::engine::EngineRegistry;
use crate::error::{Error, Result};
use crate::metadata::{self, field_bool, field_str, field_str_array};
use crate::reference::{CompleteReference, PartialReference, RawReference};
use crate::repository::{Repository, RepositoryRegistry, RegistryImportResolver};
use crate::target_app::InstalledScope;
use crate::version::VersionRequirement;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::rc::{Rc, Weak};

/// Case-insensitive string key, used for `flat_dependencies` so two
/// dependency names differing only in case never create distinct entries
/// (§3 Package invariant).
#[derive(Debug, Clone)]
pub struct CiString(pub String);

impl PartialEq for CiString {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}
impl Eq for CiString {}
impl Hash for CiString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

impl From<&str> for CiString {
    fn from(s: &str) -> Self {
        CiString(s.to_string())
    }
}

/// Metadata parsed out of a package's header comment (§3 "PackageMeta").
#[derive(Debug, Clone)]
pub struct PackageMeta {
    pub name: String,
    pub version: String,
    pub target_app: Option<String>,
    pub compatible_app_version: Option<String>,
    pub required_core_version: VersionRequirement,
    pub author: Option<String>,
    pub license: Option<String>,
    pub project_url: Option<String>,
    pub repository: String,
    pub description: Option<String>,
    pub force_global: bool,
    pub dependencies: Vec<PartialReference>,
    pub imports: Vec<PartialReference>,
    /// Lookup key built from `(name, version, repository)`, not a
    /// back-pointer (§9).
    pub self_reference: CompleteReference,
    pub raw_text: String,
    pub script_text: String,
    pub metadata_object: Value,
}

/// The output of the package loader, before the resolver wires it into a
/// tree position (depth/root/scope).
pub struct LoadedPackage {
    pub meta: PackageMeta,
    pub engine_extension: String,
}

/// §4.I: `(repository, partial_ref) -> Package`. `repositories` and
/// `import_temp_dir` back the script engine's `#load` import resolution
/// (§4.D); a package whose body never uses `#load` never touches either.
pub fn load(
    repository: &Repository,
    engines: &EngineRegistry,
    partial: &PartialReference,
    repositories: &mut RepositoryRegistry,
    import_temp_dir: &Path,
) -> Result<LoadedPackage> {
    let complete = repository.try_infer_reference(partial)?;

    let engine = repository.try_get_script_engine(&complete, engines)?;
    let engine_extension = engine.extension().to_string();

    let text = repository.try_get_package_text(&complete)?;

    let extracted = engine.try_get_meta(&text, &complete.to_string())?;
    let obj = &extracted.metadata_object;

    let name = field_str(obj, "name")
        .ok_or_else(|| Error::MalformedMetadata(complete.to_string(), "missing 'name'".to_string()))?
        .to_string();

    let dependencies = field_str_array(obj, "dependencies")
        .iter()
        .map(|s| PartialReference::parse(s))
        .collect::<Result<Vec<_>>>()?;
    let imports = field_str_array(obj, "imports")
        .iter()
        .map(|s| PartialReference::parse(s))
        .collect::<Result<Vec<_>>>()?;

    let version = complete.version().to_string();
    let repository_url = complete.repository_url().to_string();

    let self_reference = CompleteReference(RawReference {
        name: name.clone(),
        version: Some(version.clone()),
        repository_url: Some(repository_url.clone()),
        target_app: field_str(obj, "targetApp").map(str::to_string),
    });

    let import_resolver = RegistryImportResolver::new(repositories, engines);
    let (script_text, _imports) = engine.try_get_script_text(&text, complete.repository_url(), &import_resolver, import_temp_dir)?;

    let meta = PackageMeta {
        name,
        version,
        target_app: field_str(obj, "targetApp").map(str::to_string),
        compatible_app_version: field_str(obj, "compatibleAppVersion").map(str::to_string),
        required_core_version: extracted.required_core_version,
        author: field_str(obj, "author").map(str::to_string),
        license: field_str(obj, "license").map(str::to_string),
        project_url: field_str(obj, "projectUrl").map(str::to_string),
        repository: repository_url,
        description: field_str(obj, "description").map(str::to_string),
        force_global: field_bool(obj, "forceGlobal"),
        dependencies,
        imports,
        self_reference,
        raw_text: text,
        script_text,
        metadata_object: obj.clone(),
    };

    Ok(LoadedPackage { meta, engine_extension })
}

/// A name-keyed map over `Rc<RefCell<Package>>` that preserves insertion
/// order (§5 "Dependency iteration follows insertion order") while keying
/// case-insensitively (§3 invariant on `flat_dependencies`).
#[derive(Default)]
pub struct FlatDependencies {
    order: Vec<CiString>,
    entries: HashMap<CiString, Rc<RefCell<Package>>>,
}

impl FlatDependencies {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Rc<RefCell<Package>>> {
        self.entries.get(&CiString::from(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&CiString::from(name))
    }

    /// Insert or overwrite the entry for `name`, preserving its original
    /// position in iteration order if it already existed.
    pub fn insert(&mut self, name: &str, package: Rc<RefCell<Package>>) {
        let key = CiString::from(name);
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.entries.insert(key, package);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rc<RefCell<Package>>)> {
        self.order.iter().map(move |key| (key.0.as_str(), &self.entries[key]))
    }
}

/// A loaded package placed at a specific position in a dependency tree
/// (§3 "Package").
pub struct Package {
    pub meta: PackageMeta,
    pub engine_extension: String,
    pub target_app: String,
    pub scope: InstalledScope,
    pub depth: u32,
    pub root: Weak<RefCell<Package>>,
    /// Populated only on the root (§3 invariant).
    pub flat_dependencies: FlatDependencies,
}

impl Package {
    /// Construct a root package: `depth == 0`, `root` pointing at itself.
    pub fn new_root(loaded: LoadedPackage, target_app: String, scope: InstalledScope) -> Rc<RefCell<Package>> {
        let package = Rc::new(RefCell::new(Package {
            meta: loaded.meta,
            engine_extension: loaded.engine_extension,
            target_app,
            scope,
            depth: 0,
            root: Weak::new(),
            flat_dependencies: FlatDependencies::new(),
        }));
        package.borrow_mut().root = Rc::downgrade(&package);
        package
    }

    /// Construct a descendant package: `depth = parent.depth + 1`, `root`
    /// inherited from the parent.
    pub fn new_descendant(loaded: LoadedPackage, target_app: String, scope: InstalledScope, depth: u32, root: Weak<RefCell<Package>>) -> Rc<RefCell<Package>> {
        Rc::new(RefCell::new(Package {
            meta: loaded.meta,
            engine_extension: loaded.engine_extension,
            target_app,
            scope,
            depth,
            root,
            flat_dependencies: FlatDependencies::new(),
        }))
    }

    pub fn effective_scope(&self) -> InstalledScope {
        if self.meta.force_global {
            InstalledScope::Global
        } else {
            self.scope
        }
    }
}
