//! `uppm init` — scaffold `~/.uppm/config.toml` if it doesn't exist yet.

use anyhow::Result;
use uppm::Config;

pub fn run() -> Result<()> {
    let path = Config::default_path()?;

    if path.exists() {
        println!("✓ {} already exists", path.display());
        println!();
        println!("Edit it directly, or use `uppm repositories add` / `uppm target-apps add`.");
        return Ok(());
    }

    let config = Config::default();
    config.save()?;

    println!("Initialized uppm configuration at {}", path.display());
    println!();
    println!("Next steps:");
    println!("  uppm target-apps add <short-name> <app-folder> <default-repository-url>");
    println!("  uppm repositories add <url>");
    Ok(())
}
