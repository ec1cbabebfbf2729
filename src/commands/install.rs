//! `uppm install <reference>...` — build the dependency tree for each
//! reference against the active target app and run the `install` action
//! over it (§4.K).

use super::Context;
use anyhow::{Context as _, Result};
use std::io::{self, Write};
use uppm::action::{run_action, ActionOptions};
use uppm::engine::NullActionRuntime;
use uppm::package::Package;
use uppm::reference::PartialReference;
use uppm::resolver::{ResolveContext, UnattendedPrompt, UserPrompt};
use uppm::target_app::InstalledScope;

/// Prompts on the controlling terminal, defaulting to `default` if stdin
/// can't be read or the answer is blank.
struct StdinPrompt;

impl UserPrompt for StdinPrompt {
    fn confirm(&self, question: &str, default: bool) -> bool {
        print!("{question} [{}] ", if default { "Y/n" } else { "y/N" });
        let _ = io::stdout().flush();

        let mut line = String::new();
        if io::stdin().read_line(&mut line).is_err() {
            return default;
        }

        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            _ => default,
        }
    }
}

pub fn run(references: Vec<String>, app: Option<String>, unattended: bool, continue_on_error: bool) -> Result<()> {
    let mut ctx = Context::load()?;
    let app_name = ctx.select_target_app(app.as_deref())?;

    let prompt: Box<dyn UserPrompt> = if unattended { Box::new(UnattendedPrompt) } else { Box::new(StdinPrompt) };

    let mut failures = Vec::new();
    for reference_text in &references {
        match install_one(&mut ctx, &app_name, reference_text, prompt.as_ref(), unattended) {
            Ok(()) => println!("installed {reference_text}"),
            Err(e) => {
                eprintln!("failed to install {reference_text}: {e:#}");
                failures.push(reference_text.clone());
                if !continue_on_error {
                    break;
                }
            }
        }
    }

    if !failures.is_empty() {
        anyhow::bail!("{} of {} installation(s) failed", failures.len(), references.len());
    }
    Ok(())
}

fn install_one(ctx: &mut Context, app_name: &str, reference_text: &str, prompt: &dyn UserPrompt, unattended: bool) -> Result<()> {
    let partial = PartialReference::parse(reference_text).context("invalid package reference")?;
    let target_app = ctx.target_apps.get(app_name)?.clone();

    let loaded = {
        let handle = if let Some(url) = partial.repository_url() {
            ctx.repositories.get_or_create(url, &ctx.engines)?
        } else {
            ctx.repositories.resolve_without_repository(&partial)?.0
        };
        let repo = handle.borrow();
        uppm::package::load(&repo, &ctx.engines, &partial, &mut ctx.repositories, &ctx.import_temp_dir)?
    };

    let root = Package::new_root(loaded, app_name.to_string(), InstalledScope::Global);

    let mut resolve_ctx = ResolveContext {
        repositories: &mut ctx.repositories,
        engines: &ctx.engines,
        target_app: &target_app,
        prompt,
        unattended,
        log: Default::default(),
        import_temp_dir: &ctx.import_temp_dir,
    };

    let options = ActionOptions {
        recursive: true,
        confirm_license: !unattended,
    };

    run_action(
        &root,
        "install",
        &options,
        &NullActionRuntime,
        &ctx.engines,
        &ctx.target_apps,
        prompt,
        Some(&mut resolve_ctx),
    )?;

    for entry in resolve_ctx.log.0.drain(..) {
        eprintln!("warning: {} ({:?})", entry.message, entry.kind);
    }

    Ok(())
}
