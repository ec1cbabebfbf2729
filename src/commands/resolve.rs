//! `uppm resolve <reference>` — dry-run the dependency resolver and print
//! the resulting flattened tree, without running any action (replaces the
//! teacher's `tree` command against the new domain model).

use super::Context;
use anyhow::{Context as _, Result};
use std::cell::RefCell;
use std::rc::Rc;
use uppm::package::Package;
use uppm::reference::PartialReference;
use uppm::resolver::{resolve, ResolveContext, UnattendedPrompt};
use uppm::target_app::InstalledScope;

pub fn run(reference: String, app: Option<String>, unattended: bool) -> Result<()> {
    let mut ctx = Context::load()?;
    let app_name = ctx.select_target_app(app.as_deref())?;
    let partial = PartialReference::parse(&reference).context("invalid package reference")?;
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
        unattended,
        log: Default::default(),
        import_temp_dir: &ctx.import_temp_dir,
    };
    resolve(&root, &mut resolve_ctx);

    print_node(&root, 0);

    if !resolve_ctx.log.0.is_empty() {
        println!();
        println!("Conflicts:");
        for entry in &resolve_ctx.log.0 {
            println!("  {} ({:?}): {}", entry.name, entry.kind, entry.message);
        }
    }

    Ok(())
}

fn print_node(node: &Rc<RefCell<Package>>, depth: usize) {
    let node_ref = node.borrow();
    println!("{}{} {}", "  ".repeat(depth), node_ref.meta.name, node_ref.meta.version);
    let deps: Vec<_> = node_ref.flat_dependencies.iter().map(|(_, p)| p.clone()).collect();
    drop(node_ref);
    for dep in deps {
        print_node(&dep, depth + 1);
    }
}
