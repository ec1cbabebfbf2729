//! `uppm config` — show the on-disk configuration, or flip the `unattended`
//! and `force_resync` flags.

use anyhow::Result;
use uppm::Config;

pub fn show() -> Result<()> {
    let config = Config::load()?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

pub fn set_unattended(value: bool) -> Result<()> {
    let mut config = Config::load()?;
    config.general.unattended = value;
    config.save()?;
    println!("unattended = {value}");
    Ok(())
}

pub fn set_force_resync(value: bool) -> Result<()> {
    let mut config = Config::load()?;
    config.resolver.force_resync = value;
    config.save()?;
    println!("resolver.force_resync = {value}");
    Ok(())
}
