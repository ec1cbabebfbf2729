//! `uppm why <root-reference> <dependency-name>` — explain why a package
//! is present in the resolved tree, by rebuilding the tree fresh (there is
//! no persisted lockfile to consult) and reporting what it resolved to.

use super::Context;
use anyhow::{bail, Context as _, Result};
use uppm::package::Package;
use uppm::reference::PartialReference;
use uppm::resolver::{resolve, ResolveContext, UnattendedPrompt};
use uppm::target_app::InstalledScope;

pub fn run(root_reference: String, dependency_name: String, app: Option<String>) -> Result<()> {
    let mut ctx = Context::load()?;
    let app_name = ctx.select_target_app(app.as_deref())?;
    let partial = PartialReference::parse(&root_reference).context("invalid package reference")?;
    let target_app = ctx.target_apps.get(&app_name)?.clone();

    let loaded = {
        let handle = if let Some(url) = partial.repository_url() {
            ctx.repositories.get_or_create(url, &ctx.engines)?
        } else {
            ctx.repositories.resolve_without_repository(&partial)?.0
        };
        let repo = handle.borrow();
        uppm::package::load(&repo, &ctx.engines, &partial, &mut ctx.repositories, &ctx.import_temp_dir)?
    };

    let root = Package::new_root(loaded, app_name, InstalledScope::Global);

    let prompt = UnattendedPrompt;
    let mut resolve_ctx = ResolveContext {
        repositories: &mut ctx.repositories,
        engines: &ctx.engines,
        target_app: &target_app,
        prompt: &prompt,
        unattended: true,
        log: Default::default(),
        import_temp_dir: &ctx.import_temp_dir,
    };
    resolve(&root, &mut resolve_ctx);

    let root_ref = root.borrow();
    let Some(dep) = root_ref.flat_dependencies.get(&dependency_name) else {
        bail!("'{dependency_name}' is not part of {root_reference}'s resolved dependency set");
    };
    let dep_ref = dep.borrow();
    println!("{} resolved to {} (repository: {})", dependency_name, dep_ref.meta.version, dep_ref.meta.repository);
    println!("self-reference: {}", dep_ref.meta.self_reference);
    drop(dep_ref);
    drop(root_ref);

    for entry in &resolve_ctx.log.0 {
        if entry.name.eq_ignore_ascii_case(&dependency_name) {
            println!("conflict note: {} ({:?})", entry.message, entry.kind);
        }
    }
    Ok(())
}
