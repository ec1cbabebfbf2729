//! User configuration management (§4.L, ambient).
//!
//! Configuration is stored in TOML format at `~/.uppm/config.toml`
//! (override with `UPPM_CONFIG_DIR`). This is where the CLI, acting as the
//! caller the core treats as external, registers the process-wide
//! singletons the spec describes in §5: known repositories, known target
//! apps, the Git credential/certificate policy, the shared `temporary_folder`
//! import-resolution scratch space lives under, and the `unattended` default.
//!
//! The core itself never reads this file — `uppm::config` only exists to
//! turn on-disk settings into the values `repository::Repository`,
//! `target_app::TargetApp`, and `repository::RepositoryRegistry` expect.

use crate::engine::EngineRegistry;
use crate::repository::{CertificatePolicy, Credentials, Repository, RepositoryRegistry};
use crate::target_app::TargetApp;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// User configuration file (`~/.uppm/config.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default, rename = "target_app")]
    pub target_apps: Vec<TargetAppConfig>,

    #[serde(default, rename = "repository")]
    pub repositories: Vec<RepositoryConfig>,

    #[serde(default)]
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Scratch folder for Git checkouts and engine `#load` import files
    /// (§6 "Persisted state": Git checkouts and imported script files live
    /// under a caller-provided `temporary_folder`).
    #[serde(default = "default_temporary_folder")]
    pub temporary_folder: PathBuf,

    /// Default answer for interactive confirmations when no terminal is
    /// attached (§9 "User prompts"). The core never reads this directly —
    /// the CLI passes it down to `UnattendedPrompt`/`--unattended`.
    #[serde(default)]
    pub unattended: bool,

    /// Short name of the target app `--app` defaults to when a command
    /// omits it and more than one app is configured (`target-apps
    /// set-current`).
    #[serde(default)]
    pub current_target_app: Option<String>,
}

fn default_temporary_folder() -> PathBuf {
    std::env::temp_dir().join("uppm")
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            temporary_folder: default_temporary_folder(),
            unattended: false,
            current_target_app: None,
        }
    }
}

/// One registered target application (§3 "TargetApp", §4.H).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetAppConfig {
    pub short_name: String,
    #[serde(default = "default_architecture")]
    pub architecture: String,
    pub app_folder: PathBuf,
    pub global_packs_folder: PathBuf,
    pub local_packs_folder: PathBuf,
    pub executable: PathBuf,
    pub default_repository_url: String,
}

fn default_architecture() -> String {
    "unknown".to_string()
}

impl TargetAppConfig {
    pub fn to_target_app(&self) -> TargetApp {
        TargetApp {
            short_name: self.short_name.clone(),
            architecture: self.architecture.clone(),
            app_folder: self.app_folder.clone(),
            global_packs_folder: self.global_packs_folder.clone(),
            local_packs_folder: self.local_packs_folder.clone(),
            executable: self.executable.clone(),
            default_repository_url: self.default_repository_url.clone(),
        }
    }
}

/// One registered repository (§3 "Repository" common fields, §4.F "known
/// types").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub url: String,

    /// Only meaningful for Git repositories; ignored for filesystem ones.
    #[serde(default)]
    pub certificate_policy: CertificatePolicyConfig,

    /// Never a raw secret — a reference to an OS keychain/credential-helper
    /// entry name, resolved by the caller before it reaches `git2`.
    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub custom_headers: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificatePolicyConfig {
    #[default]
    SystemDefault,
    AcceptAll,
}

impl From<CertificatePolicyConfig> for CertificatePolicy {
    fn from(c: CertificatePolicyConfig) -> Self {
        match c {
            CertificatePolicyConfig::SystemDefault => CertificatePolicy::SystemDefault,
            CertificatePolicyConfig::AcceptAll => CertificatePolicy::AcceptAll,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialsConfig {
    #[default]
    None,
    UserPassPlaintext { username: String, password: String },
    SshKeyFromAgent { username: String },
}

impl From<CredentialsConfig> for Credentials {
    fn from(c: CredentialsConfig) -> Self {
        match c {
            CredentialsConfig::None => Credentials::None,
            CredentialsConfig::UserPassPlaintext { username, password } => {
                Credentials::UserPassPlaintext { username, password }
            }
            CredentialsConfig::SshKeyFromAgent { username } => Credentials::SshKeyFromAgent { username },
        }
    }
}

/// §4.E "Force re-synchronization is governed by a process-wide flag."
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub force_resync: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            target_apps: Vec::new(),
            repositories: Vec::new(),
            resolver: ResolverConfig::default(),
        }
    }
}

impl Config {
    /// `~/.uppm/config.toml`, or `$UPPM_CONFIG_DIR/config.toml` if set.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("UPPM_CONFIG_DIR") {
            return Ok(PathBuf::from(dir).join("config.toml"));
        }

        let home = dirs::home_dir().ok_or_else(|| Error::Other("could not determine home directory".to_string()))?;
        Ok(home.join(".uppm").join("config.toml"))
    }

    /// Load config from file, or return the default config if it doesn't
    /// exist yet (mirrors §4.F's "known-types" being populated before any
    /// resolution begins — the CLI calls `load` once at startup).
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn find_target_app(&self, short_name: &str) -> Option<&TargetAppConfig> {
        self.target_apps.iter().find(|a| a.short_name.eq_ignore_ascii_case(short_name))
    }

    pub fn add_target_app(&mut self, app: TargetAppConfig) {
        self.target_apps.retain(|a| !a.short_name.eq_ignore_ascii_case(&app.short_name));
        self.target_apps.push(app);
    }

    pub fn add_repository(&mut self, repository: RepositoryConfig) {
        self.repositories.retain(|r| !r.url.eq_ignore_ascii_case(&repository.url));
        self.repositories.push(repository);
    }

    /// Build a fresh `RepositoryRegistry` with every configured repository
    /// registered as a default (§4.F), ready for `resolve`/`run_action`.
    pub fn build_repository_registry(&self, engines: &EngineRegistry) -> Result<RepositoryRegistry> {
        let mut registry = RepositoryRegistry::new(self.general.temporary_folder.join("git"));
        registry.set_force_resync(self.resolver.force_resync);

        for repo_config in &self.repositories {
            let mut repository = match crate::repository::recognize(&repo_config.url) {
                Some(crate::repository::RepositoryKind::Git) => {
                    let checkout = self.general.temporary_folder.join("git").join(sanitize(&repo_config.url));
                    Repository::new_git(repo_config.url.clone(), checkout)
                }
                Some(crate::repository::RepositoryKind::Filesystem) | None => {
                    Repository::new_filesystem(repo_config.url.clone(), PathBuf::from(&repo_config.url))
                }
            };
            if let Repository::Git(git_repo) = &mut repository {
                git_repo.certificate_policy = repo_config.certificate_policy.into();
                git_repo.credentials = repo_config.credentials.clone().into();
                git_repo.custom_headers = repo_config.custom_headers.clone();
            }
            let handle = registry.register_default(repository);
            handle.borrow_mut().refresh(engines, self.resolver.force_resync).ok();
        }

        Ok(registry)
    }
}

fn sanitize(url: &str) -> String {
    url.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_apps_or_repositories() {
        let config = Config::default();
        assert!(config.target_apps.is_empty());
        assert!(config.repositories.is_empty());
        assert!(!config.general.unattended);
    }

    #[test]
    fn add_target_app_replaces_same_name() {
        let mut config = Config::default();
        config.add_target_app(TargetAppConfig {
            short_name: "studio".to_string(),
            architecture: "x86_64".to_string(),
            app_folder: PathBuf::from("/tmp/studio"),
            global_packs_folder: PathBuf::from("/tmp/studio/global"),
            local_packs_folder: PathBuf::from("/tmp/studio/local"),
            executable: PathBuf::from("/tmp/studio/app"),
            default_repository_url: "https://example.com/repo.git".to_string(),
        });
        config.add_target_app(TargetAppConfig {
            short_name: "Studio".to_string(),
            architecture: "arm64".to_string(),
            app_folder: PathBuf::from("/tmp/studio2"),
            global_packs_folder: PathBuf::from("/tmp/studio2/global"),
            local_packs_folder: PathBuf::from("/tmp/studio2/local"),
            executable: PathBuf::from("/tmp/studio2/app"),
            default_repository_url: "https://example.com/repo.git".to_string(),
        });
        assert_eq!(config.target_apps.len(), 1);
        assert_eq!(config.target_apps[0].architecture, "arm64");
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = Config::default();
        config.add_repository(RepositoryConfig {
            url: "https://example.com/repo.git".to_string(),
            certificate_policy: CertificatePolicyConfig::SystemDefault,
            credentials: CredentialsConfig::None,
            custom_headers: Vec::new(),
        });
        let text = toml::to_string_pretty(&config).unwrap();
        let reloaded: Config = toml::from_str(&text).unwrap();
        assert_eq!(reloaded.repositories.len(), 1);
    }
}
