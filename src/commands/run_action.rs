//! `uppm run-action <action> <reference>` — the generic §4.K entry point
//! for actions besides `install` (e.g. whatever custom action name a
//! package's script chooses to expose).

use super::Context;
use anyhow::{Context as _, Result};
use uppm::action::{run_action as run_action_core, ActionOptions};
use uppm::engine::NullActionRuntime;
use uppm::package::Package;
use uppm::reference::PartialReference;
use uppm::resolver::{resolve, ResolveContext, UnattendedPrompt};
use uppm::target_app::InstalledScope;

pub fn run(action: String, reference: String, app: Option<String>, recursive: bool) -> Result<()> {
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
        unattended: true,
        log: Default::default(),
        import_temp_dir: &ctx.import_temp_dir,
    };

    if recursive {
        resolve(&root, &mut resolve_ctx);
    }

    let options = ActionOptions {
        recursive,
        confirm_license: false,
    };

    run_action_core(
        &root,
        &action,
        &options,
        &NullActionRuntime,
        &ctx.engines,
        &ctx.target_apps,
        &prompt,
        None,
    )?;

    for entry in resolve_ctx.log.0.drain(..) {
        eprintln!("warning: {} ({:?})", entry.message, entry.kind);
    }

    println!("ran action '{action}' for {reference}");
    Ok(())
}
