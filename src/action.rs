//! Action runner (§4.K): executes a named action over the flattened
//! dependency graph, with a license-confirmation gate at the root.

use crate::engine::{ActionRuntime, EngineRegistry};
use crate::error::{Error, Result};
use crate::package::Package;
use crate::resolver::{resolve, ResolveContext, UserPrompt};
use crate::target_app::TargetAppRegistry;
use std::cell::RefCell;
use std::rc::Rc;

pub struct ActionOptions {
    pub recursive: bool,
    pub confirm_license: bool,
}

/// §4.K `run_action(action, recursive, confirm_license)`. `prompt` backs the
/// license-confirmation gate; callers that also pass `resolve_ctx` (to build
/// the tree lazily at the root) typically hand in the same prompt they gave
/// that context.
pub fn run_action(
    root: &Rc<RefCell<Package>>,
    action: &str,
    options: &ActionOptions,
    runtime: &dyn ActionRuntime,
    engines: &EngineRegistry,
    target_apps: &TargetAppRegistry,
    prompt: &dyn UserPrompt,
    resolve_ctx: Option<&mut ResolveContext>,
) -> Result<()> {
    let target_app_name = root.borrow().meta.target_app.clone().ok_or_else(|| {
        Error::UnknownTargetApp("<none>".to_string())
    })?;
    target_apps.get(&target_app_name)?;

    let depth = root.borrow().depth;
    let is_empty = root.borrow().flat_dependencies.is_empty();

    if depth == 0 && options.recursive {
        if is_empty {
            if let Some(ctx) = resolve_ctx {
                resolve(root, ctx);
            }
        }

        if action == "install" && options.confirm_license {
            confirm_licenses(root, prompt)?;
        }
    }

    run_tree(root, action, options, runtime, engines)
}

fn confirm_licenses(root: &Rc<RefCell<Package>>, prompt: &dyn crate::resolver::UserPrompt) -> Result<()> {
    let root_ref = root.borrow();
    let mut summary = format!("{} ({})", root_ref.meta.name, root_ref.meta.license.as_deref().unwrap_or("unspecified"));
    for (name, dep) in root_ref.flat_dependencies.iter() {
        let dep_ref = dep.borrow();
        summary.push_str(&format!("\n  {} ({})", name, dep_ref.meta.license.as_deref().unwrap_or("unspecified")));
    }
    drop(root_ref);

    let accepted = prompt.confirm(&format!("Accept the following licenses?\n{summary}"), true);
    if !accepted {
        return Err(Error::ActionFailed {
            action: "install".to_string(),
            package: root.borrow().meta.name.clone(),
            reason: "license not accepted".to_string(),
        });
    }
    Ok(())
}

fn run_tree(node: &Rc<RefCell<Package>>, action: &str, options: &ActionOptions, runtime: &dyn ActionRuntime, engines: &EngineRegistry) -> Result<()> {
    let deps: Vec<_> = node.borrow().flat_dependencies.iter().map(|(_, p)| p.clone()).collect();
    for dep in &deps {
        let dep_name = dep.borrow().meta.name.clone();
        run_action_recursive(dep, action, options, runtime, engines).map_err(|e| {
            Error::ActionFailed {
                action: action.to_string(),
                package: dep_name,
                reason: e.to_string(),
            }
        })?;
    }
    invoke_engine(node, action, runtime, engines)
}

fn run_action_recursive(node: &Rc<RefCell<Package>>, action: &str, options: &ActionOptions, runtime: &dyn ActionRuntime, engines: &EngineRegistry) -> Result<()> {
    run_tree(node, action, options, runtime, engines)
}

/// Materializes the package's (import-resolved) script body to a temp file
/// and hands that path to the engine. `run_action` invokes the script, not
/// the bare `name:version@repository` reference a `self_reference` prints.
fn invoke_engine(node: &Rc<RefCell<Package>>, action: &str, runtime: &dyn ActionRuntime, engines: &EngineRegistry) -> Result<()> {
    let node_ref = node.borrow();
    let engine = engines.get_or_err(&node_ref.engine_extension)?;

    let script_path = materialize_script(&node_ref)?;

    engine.run_action(runtime, &node_ref.target_app, &node_ref.meta.name, &node_ref.meta.version, action, &script_path.to_string_lossy())
}

fn materialize_script(node_ref: &Package) -> Result<std::path::PathBuf> {
    let dir = std::env::temp_dir().join("uppm").join("actions");
    std::fs::create_dir_all(&dir)?;
    let slug = node_ref.meta.self_reference.to_string().chars().map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' }).collect::<String>();
    let path = dir.join(format!("{slug}.{}", node_ref.engine_extension));
    std::fs::write(&path, &node_ref.meta.script_text)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NullActionRuntime;
    use crate::package::{LoadedPackage, PackageMeta};
    use crate::reference::{CompleteReference, RawReference};
    use crate::target_app::InstalledScope;
    use crate::version::VersionRequirement;
    use serde_json::Value;

    fn loaded(name: &str) -> LoadedPackage {
        LoadedPackage {
            meta: PackageMeta {
                name: name.to_string(),
                version: "1.0".to_string(),
                target_app: Some("studio".to_string()),
                compatible_app_version: None,
                required_core_version: VersionRequirement::new(crate::version::Version::new(0, 0, 0, 0)),
                author: None,
                license: Some("MIT".to_string()),
                project_url: None,
                repository: "repo".to_string(),
                description: None,
                force_global: false,
                dependencies: Vec::new(),
                imports: Vec::new(),
                self_reference: CompleteReference(RawReference {
                    name: name.to_string(),
                    version: Some("1.0".to_string()),
                    repository_url: Some("repo".to_string()),
                    target_app: None,
                }),
                raw_text: String::new(),
                script_text: String::new(),
                metadata_object: Value::Null,
            },
            engine_extension: "csup".to_string(),
        }
    }

    #[test]
    fn run_action_with_no_dependencies_invokes_engine_once() {
        let root = Package::new_root(loaded("root-pkg"), "studio".to_string(), InstalledScope::Global);
        let engines = EngineRegistry::with_builtins();
        let mut target_apps = TargetAppRegistry::new();
        target_apps.register(crate::target_app::TargetApp {
            short_name: "studio".to_string(),
            architecture: "x86_64".to_string(),
            app_folder: "/tmp".into(),
            global_packs_folder: "/tmp/global".into(),
            local_packs_folder: "/tmp/local".into(),
            executable: "/tmp/app".into(),
            default_repository_url: "repo".to_string(),
        });

        let options = ActionOptions {
            recursive: true,
            confirm_license: false,
        };
        let result = run_action(&root, "install", &options, &NullActionRuntime, &engines, &target_apps, &crate::resolver::UnattendedPrompt, None);
        assert!(result.is_ok());
    }

    #[test]
    fn run_action_with_unknown_target_app_fails() {
        let root = Package::new_root(loaded("root-pkg"), "missing-app".to_string(), InstalledScope::Global);
        let engines = EngineRegistry::with_builtins();
        let target_apps = TargetAppRegistry::new();
        let options = ActionOptions {
            recursive: true,
            confirm_license: false,
        };
        let result = run_action(&root, "install", &options, &NullActionRuntime, &engines, &target_apps, &crate::resolver::UnattendedPrompt, None);
        assert!(result.is_err());
    }
}
