//! `fetchbot config` – show where the config lives and what is in effect.

use anyhow::Result;
use fetchbot_core::config::{self, FetchbotConfig};
use std::path::Path;

pub fn run_config(explicit: Option<&Path>, cfg: &FetchbotConfig) -> Result<()> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => config::config_path()?,
    };
    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
