//! `uppm uninstall <reference>` — thin wrapper over `run-action uninstall`.

use anyhow::Result;

pub fn run(reference: String, app: Option<String>) -> Result<()> {
    super::run_action::run("uninstall".to_string(), reference, app, true)
}
