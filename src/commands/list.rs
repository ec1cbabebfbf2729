//! `uppm list` — enumerate packages installed into the active target app.

use super::Context;
use anyhow::{bail, Result};
use uppm::target_app::InstalledScope;

pub fn run(app: Option<String>, scope: Option<String>) -> Result<()> {
    let mut ctx = Context::load()?;
    let app_name = ctx.select_target_app(app.as_deref())?;
    let target_app = ctx.target_apps.get(&app_name)?;

    let scopes = match scope.as_deref() {
        Some("global") => vec![InstalledScope::Global],
        Some("local") => vec![InstalledScope::Local],
        Some(other) => bail!("unknown scope '{other}', expected 'global' or 'local'"),
        None => vec![InstalledScope::Global, InstalledScope::Local],
    };

    let mut any = false;
    for scope in scopes {
        for reference in target_app.enumerate_installed(scope) {
            any = true;
            println!("[{scope:?}] {reference}");
        }
    }

    if !any {
        println!("no packages installed for '{app_name}'");
    }
    Ok(())
}
