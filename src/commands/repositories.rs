//! `uppm repositories` — list, add, and refresh the repositories recorded
//! in `~/.uppm/config.toml`.

use super::Context;
use anyhow::Result;
use uppm::config::{CertificatePolicyConfig, CredentialsConfig, RepositoryConfig};
use uppm::Config;

pub fn list() -> Result<()> {
    let config = Config::load()?;
    if config.repositories.is_empty() {
        println!("no repositories configured");
        return Ok(());
    }
    for repo in &config.repositories {
        println!("{}", repo.url);
    }
    Ok(())
}

pub fn add(url: String, accept_all_certificates: bool) -> Result<()> {
    let mut config = Config::load()?;
    config.add_repository(RepositoryConfig {
        url: url.clone(),
        certificate_policy: if accept_all_certificates {
            CertificatePolicyConfig::AcceptAll
        } else {
            CertificatePolicyConfig::SystemDefault
        },
        credentials: CredentialsConfig::None,
        custom_headers: Vec::new(),
    });
    config.save()?;
    println!("added repository {url}");
    Ok(())
}

/// `Context::load` already refreshes every configured repository against
/// its backend; this just reports what that refresh found.
pub fn refresh() -> Result<()> {
    let ctx = Context::load()?;
    for handle in ctx.repositories.defaults() {
        let repo = handle.borrow();
        if let Some(err) = repo.last_refresh_error() {
            println!("{}: failed ({err})", repo.url());
        } else {
            println!("{}: ok, {} package(s) cataloged", repo.url(), repo.catalog().len());
        }
    }
    Ok(())
}
