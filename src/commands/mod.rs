//! CLI command implementations, each a thin layer over `uppm`'s library
//! modules: parse arguments, build an [`Context`] from the on-disk
//! configuration, call into the core, print.

pub mod config;
pub mod doctor;
pub mod init;
pub mod install;
pub mod list;
pub mod repositories;
pub mod resolve;
pub mod run_action;
pub mod target_apps;
pub mod uninstall;
pub mod why;

use anyhow::{bail, Result};
use std::path::PathBuf;
use uppm::engine::EngineRegistry;
use uppm::repository::RepositoryRegistry;
use uppm::target_app::TargetAppRegistry;
use uppm::Config;

/// Everything a command needs out of the on-disk configuration, assembled
/// once at the top of `main`.
pub struct Context {
    pub config: Config,
    pub engines: EngineRegistry,
    pub repositories: RepositoryRegistry,
    pub target_apps: TargetAppRegistry,
    /// Scratch folder engine `#load` import resolution materializes files
    /// under (§4.D), derived from `config.general.temporary_folder`.
    pub import_temp_dir: PathBuf,
}

impl Context {
    pub fn load() -> Result<Self> {
        let config = Config::load()?;
        let engines = EngineRegistry::with_builtins();
        let repositories = config.build_repository_registry(&engines)?;
        let import_temp_dir = config.general.temporary_folder.join("imports");

        let mut target_apps = TargetAppRegistry::new();
        for app in &config.target_apps {
            target_apps.register(app.to_target_app());
        }

        Ok(Self {
            config,
            engines,
            repositories,
            target_apps,
            import_temp_dir,
        })
    }

    /// Resolve which target app a command should act against: the
    /// `--app` flag if given, else the sole configured app, else an error
    /// asking the caller to disambiguate.
    pub fn select_target_app(&mut self, requested: Option<&str>) -> Result<String> {
        let name = match requested {
            Some(name) => name.to_string(),
            None => match (&self.config.general.current_target_app, self.config.target_apps.as_slice()) {
                (Some(current), _) => current.clone(),
                (None, [only]) => only.short_name.clone(),
                (None, []) => bail!("no target apps configured; run `uppm target-apps add` first"),
                (None, _) => bail!("multiple target apps configured; pass --app <short-name>, or run `uppm target-apps set-current`"),
            },
        };

        self.target_apps
            .set_current(&name, &mut self.repositories, &self.engines)?;
        Ok(name)
    }
}
