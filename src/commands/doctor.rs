//! `uppm doctor` — diagnose repository reachability and target app
//! validity, in the style of the teacher project's diagnostic table.

use anyhow::Result;
use uppm::config::Config;
use uppm::engine::EngineRegistry;

#[derive(Debug)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckStatus {
    fn symbol(&self) -> &'static str {
        match self {
            CheckStatus::Ok => "\u{2713}",
            CheckStatus::Warning => "\u{26a0}",
            CheckStatus::Error => "\u{2717}",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            CheckStatus::Ok => "\x1b[32m",
            CheckStatus::Warning => "\x1b[33m",
            CheckStatus::Error => "\x1b[31m",
        }
    }
}

struct CheckResult {
    name: String,
    status: CheckStatus,
    message: String,
}

impl CheckResult {
    fn new(name: impl Into<String>, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
        }
    }

    fn print(&self) {
        let reset = "\x1b[0m";
        println!("  {}{}{} {} - {}", self.status.color_code(), self.status.symbol(), reset, self.name, self.message);
    }
}

pub fn run() -> Result<()> {
    println!("uppm doctor");
    println!("===========");
    println!();

    let config = Config::load()?;
    let engines = EngineRegistry::with_builtins();

    let mut results = Vec::new();

    if config.target_apps.is_empty() {
        results.push(CheckResult::new("target apps", CheckStatus::Warning, "none configured; run `uppm target-apps add`"));
    }
    for app in &config.target_apps {
        results.push(check_target_app(app));
    }

    if config.repositories.is_empty() {
        results.push(CheckResult::new("repositories", CheckStatus::Warning, "none configured; run `uppm repositories add`"));
    }
    for repo_config in &config.repositories {
        results.push(check_repository(repo_config, &engines));
    }

    for result in &results {
        result.print();
    }

    let error_count = results.iter().filter(|r| matches!(r.status, CheckStatus::Error)).count();
    let warn_count = results.iter().filter(|r| matches!(r.status, CheckStatus::Warning)).count();

    println!();
    println!("Summary: {} passed, {warn_count} warnings, {error_count} errors", results.len() - warn_count - error_count);

    if error_count > 0 {
        anyhow::bail!("one or more checks failed");
    }
    Ok(())
}

fn check_target_app(app: &uppm::config::TargetAppConfig) -> CheckResult {
    if !app.app_folder.is_dir() {
        return CheckResult::new(
            format!("target app '{}'", app.short_name),
            CheckStatus::Error,
            format!("app folder '{}' does not exist", app.app_folder.display()),
        );
    }
    if !app.executable.exists() {
        return CheckResult::new(
            format!("target app '{}'", app.short_name),
            CheckStatus::Warning,
            format!("executable '{}' does not exist", app.executable.display()),
        );
    }
    CheckResult::new(format!("target app '{}'", app.short_name), CheckStatus::Ok, "app folder and executable found")
}

fn check_repository(repo_config: &uppm::config::RepositoryConfig, engines: &EngineRegistry) -> CheckResult {
    let Some(kind) = uppm::repository::recognize(&repo_config.url) else {
        return CheckResult::new(format!("repository '{}'", repo_config.url), CheckStatus::Error, "URL shape matches no known repository backend");
    };

    let mut repository = match kind {
        uppm::repository::RepositoryKind::Git => {
            uppm::repository::Repository::new_git(repo_config.url.clone(), std::env::temp_dir().join("uppm").join("doctor"))
        }
        uppm::repository::RepositoryKind::Filesystem => {
            uppm::repository::Repository::new_filesystem(repo_config.url.clone(), std::path::PathBuf::from(&repo_config.url))
        }
    };

    if !repository.exists() {
        return CheckResult::new(format!("repository '{}'", repo_config.url), CheckStatus::Error, "not reachable");
    }

    match repository.refresh(engines, false) {
        Ok(()) => CheckResult::new(
            format!("repository '{}'", repo_config.url),
            CheckStatus::Ok,
            format!("reachable, {} package(s) cataloged", repository.catalog().len()),
        ),
        Err(e) => CheckResult::new(format!("repository '{}'", repo_config.url), CheckStatus::Warning, format!("reachable but catalog refresh failed: {e}")),
    }
}
