//! `uppm target-apps` — list, add, and switch the active target app.

use anyhow::{bail, Result};
use std::path::PathBuf;
use uppm::config::TargetAppConfig;
use uppm::Config;

pub fn list() -> Result<()> {
    let config = Config::load()?;
    if config.target_apps.is_empty() {
        println!("no target apps configured");
        return Ok(());
    }
    for app in &config.target_apps {
        let marker = if config.general.current_target_app.as_deref() == Some(app.short_name.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{marker} {} ({})", app.short_name, app.app_folder.display());
    }
    Ok(())
}

pub fn add(short_name: String, app_folder: PathBuf, default_repository_url: String) -> Result<()> {
    let mut config = Config::load()?;
    let executable = app_folder.join(&short_name);
    config.add_target_app(TargetAppConfig {
        short_name: short_name.clone(),
        architecture: "unknown".to_string(),
        global_packs_folder: app_folder.join("Packs").join("Global"),
        local_packs_folder: app_folder.join("Packs").join("Local"),
        executable,
        app_folder,
        default_repository_url,
    });
    if config.target_apps.len() == 1 {
        config.general.current_target_app = Some(short_name.clone());
    }
    config.save()?;
    println!("added target app '{short_name}'");
    Ok(())
}

pub fn set_current(short_name: String) -> Result<()> {
    let mut config = Config::load()?;
    if config.find_target_app(&short_name).is_none() {
        bail!("unknown target app '{short_name}'; run `uppm target-apps add` first");
    }
    config.general.current_target_app = Some(short_name.clone());
    config.save()?;
    println!("'{short_name}' is now the current target app");
    Ok(())
}
