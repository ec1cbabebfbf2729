//! End-to-end tests driving the real filesystem repository catalog, the
//! package loader, and the dependency resolver together, the way a single
//! `uppm install` invocation would.

use std::fs;
use std::path::Path;
use uppm::engine::EngineRegistry;
use uppm::package::Package;
use uppm::reference::PartialReference;
use uppm::repository::{Repository, RepositoryRegistry};
use uppm::resolver::{resolve, ResolveContext, UnattendedPrompt};
use uppm::target_app::{InstalledScope, TargetApp};

fn write_package(root: &Path, author: &str, name: &str, version: &str, dependencies: &[&str]) {
    let dir = root.join(author).join(name);
    fs::create_dir_all(&dir).unwrap();
    let deps = dependencies
        .iter()
        .map(|d| format!("\"{d}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let body = format!(
        "/*\nuppm 0.0.1\n{{\n  name: {name}\n  version: {version}\n  targetApp: studio\n  license: MIT\n  dependencies: [{deps}]\n}}\n*/\nprint(\"{name} {version}\")\n"
    );
    fs::write(dir.join(format!("{version}.csup")), body).unwrap();
}

fn fixture_target_app(packs_dir: &Path) -> TargetApp {
    TargetApp {
        short_name: "studio".to_string(),
        architecture: "x86_64".to_string(),
        app_folder: packs_dir.to_path_buf(),
        global_packs_folder: packs_dir.join("Global"),
        local_packs_folder: packs_dir.join("Local"),
        executable: packs_dir.join("studio.exe"),
        default_repository_url: "repo".to_string(),
    }
}

#[test]
fn builds_flat_dependency_tree_from_a_filesystem_catalog() {
    let repo_dir = tempfile::tempdir().unwrap();
    write_package(repo_dir.path(), "acme", "root-pkg", "1.0", &["lib-a:1.0", "lib-b:latest"]);
    write_package(repo_dir.path(), "acme", "lib-a", "1.0", &[]);
    write_package(repo_dir.path(), "acme", "lib-b", "3.1", &[]);

    let engines = EngineRegistry::with_builtins();
    let mut repository = Repository::new_filesystem("repo", repo_dir.path().to_path_buf());
    repository.refresh(&engines, false).unwrap();

    let mut repositories = RepositoryRegistry::new(repo_dir.path().join(".git-checkouts"));
    repositories.register_default(repository);
    let import_temp_dir = repo_dir.path().join("imports");

    let partial = PartialReference::parse("root-pkg@repo").unwrap();
    let loaded = {
        let handle = repositories.get_or_create("repo", &engines).unwrap();
        let repo = handle.borrow();
        uppm::package::load(&repo, &engines, &partial, &mut repositories, &import_temp_dir).unwrap()
    };
    let root = Package::new_root(loaded, "studio".to_string(), InstalledScope::Global);

    let apps_dir = tempfile::tempdir().unwrap();
    let target_app = fixture_target_app(apps_dir.path());

    let prompt = UnattendedPrompt;
    let mut ctx = ResolveContext {
        repositories: &mut repositories,
        engines: &engines,
        target_app: &target_app,
        prompt: &prompt,
        unattended: true,
        log: Default::default(),
        import_temp_dir: &import_temp_dir,
    };
    resolve(&root, &mut ctx);

    let root_ref = root.borrow();
    assert_eq!(root_ref.flat_dependencies.len(), 2);
    assert_eq!(root_ref.flat_dependencies.get("lib-a").unwrap().borrow().meta.version, "1.0");
    assert_eq!(root_ref.flat_dependencies.get("lib-b").unwrap().borrow().meta.version, "3.1");
    assert!(ctx.log.0.is_empty());
}

#[test]
fn transitive_dependencies_flatten_into_the_root() {
    let repo_dir = tempfile::tempdir().unwrap();
    write_package(repo_dir.path(), "acme", "root-pkg", "1.0", &["lib-a:1.0"]);
    write_package(repo_dir.path(), "acme", "lib-a", "1.0", &["lib-c:1.0"]);
    write_package(repo_dir.path(), "acme", "lib-c", "1.0", &[]);

    let engines = EngineRegistry::with_builtins();
    let mut repository = Repository::new_filesystem("repo", repo_dir.path().to_path_buf());
    repository.refresh(&engines, false).unwrap();

    let mut repositories = RepositoryRegistry::new(repo_dir.path().join(".git-checkouts"));
    repositories.register_default(repository);
    let import_temp_dir = repo_dir.path().join("imports");

    let partial = PartialReference::parse("root-pkg@repo").unwrap();
    let loaded = {
        let handle = repositories.get_or_create("repo", &engines).unwrap();
        let repo = handle.borrow();
        uppm::package::load(&repo, &engines, &partial, &mut repositories, &import_temp_dir).unwrap()
    };
    let root = Package::new_root(loaded, "studio".to_string(), InstalledScope::Global);

    let apps_dir = tempfile::tempdir().unwrap();
    let target_app = fixture_target_app(apps_dir.path());

    let prompt = UnattendedPrompt;
    let mut ctx = ResolveContext {
        repositories: &mut repositories,
        engines: &engines,
        target_app: &target_app,
        prompt: &prompt,
        unattended: true,
        log: Default::default(),
        import_temp_dir: &import_temp_dir,
    };
    resolve(&root, &mut ctx);

    let root_ref = root.borrow();
    assert_eq!(root_ref.flat_dependencies.len(), 2, "lib-a and its own dependency lib-c both flatten into the root");
    assert!(root_ref.flat_dependencies.contains("lib-c"));
}

#[test]
fn duplicate_dependency_entries_with_different_majors_log_a_conflict_and_keep_the_newest() {
    let repo_dir = tempfile::tempdir().unwrap();
    write_package(repo_dir.path(), "acme", "root-pkg", "1.0", &["lib-a:1.0", "lib-a:2.0"]);
    write_package(repo_dir.path(), "acme", "lib-a", "1.0", &[]);
    write_package(repo_dir.path(), "acme", "lib-a", "2.0", &[]);

    let engines = EngineRegistry::with_builtins();
    let mut repository = Repository::new_filesystem("repo", repo_dir.path().to_path_buf());
    repository.refresh(&engines, false).unwrap();

    let mut repositories = RepositoryRegistry::new(repo_dir.path().join(".git-checkouts"));
    repositories.register_default(repository);
    let import_temp_dir = repo_dir.path().join("imports");

    let partial = PartialReference::parse("root-pkg@repo").unwrap();
    let loaded = {
        let handle = repositories.get_or_create("repo", &engines).unwrap();
        let repo = handle.borrow();
        uppm::package::load(&repo, &engines, &partial, &mut repositories, &import_temp_dir).unwrap()
    };
    let root = Package::new_root(loaded, "studio".to_string(), InstalledScope::Global);

    let apps_dir = tempfile::tempdir().unwrap();
    let target_app = fixture_target_app(apps_dir.path());

    let prompt = UnattendedPrompt;
    let mut ctx = ResolveContext {
        repositories: &mut repositories,
        engines: &engines,
        target_app: &target_app,
        prompt: &prompt,
        unattended: true,
        log: Default::default(),
        import_temp_dir: &import_temp_dir,
    };
    resolve(&root, &mut ctx);

    let root_ref = root.borrow();
    assert_eq!(root_ref.flat_dependencies.len(), 1);
    assert_eq!(root_ref.flat_dependencies.get("lib-a").unwrap().borrow().meta.version, "2.0");
    assert_eq!(ctx.log.0.len(), 1);
    assert_eq!(ctx.log.0[0].kind, uppm::resolver::ConflictKind::MajorMinorConflict);
}

#[test]
fn duplicate_dependency_entries_with_only_differing_minors_log_a_conflict_and_keep_the_newest() {
    let repo_dir = tempfile::tempdir().unwrap();
    write_package(repo_dir.path(), "acme", "root-pkg", "1.0", &["lib-a:1.2", "lib-a:1.5"]);
    write_package(repo_dir.path(), "acme", "lib-a", "1.2", &[]);
    write_package(repo_dir.path(), "acme", "lib-a", "1.5", &[]);

    let engines = EngineRegistry::with_builtins();
    let mut repository = Repository::new_filesystem("repo", repo_dir.path().to_path_buf());
    repository.refresh(&engines, false).unwrap();

    let mut repositories = RepositoryRegistry::new(repo_dir.path().join(".git-checkouts"));
    repositories.register_default(repository);
    let import_temp_dir = repo_dir.path().join("imports");

    let partial = PartialReference::parse("root-pkg@repo").unwrap();
    let loaded = {
        let handle = repositories.get_or_create("repo", &engines).unwrap();
        let repo = handle.borrow();
        uppm::package::load(&repo, &engines, &partial, &mut repositories, &import_temp_dir).unwrap()
    };
    let root = Package::new_root(loaded, "studio".to_string(), InstalledScope::Global);

    let apps_dir = tempfile::tempdir().unwrap();
    let target_app = fixture_target_app(apps_dir.path());

    let prompt = UnattendedPrompt;
    let mut ctx = ResolveContext {
        repositories: &mut repositories,
        engines: &engines,
        target_app: &target_app,
        prompt: &prompt,
        unattended: true,
        log: Default::default(),
        import_temp_dir: &import_temp_dir,
    };
    resolve(&root, &mut ctx);

    let root_ref = root.borrow();
    assert_eq!(root_ref.flat_dependencies.len(), 1);
    assert_eq!(root_ref.flat_dependencies.get("lib-a").unwrap().borrow().meta.version, "1.5");
    assert_eq!(ctx.log.0.len(), 1);
    assert_eq!(ctx.log.0[0].kind, uppm::resolver::ConflictKind::MajorMinorConflict);
}
