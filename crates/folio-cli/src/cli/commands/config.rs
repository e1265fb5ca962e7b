//! `folio config` – show where the config lives and what is in effect.

use anyhow::Result;
use folio_core::config::{self, FolioConfig};

pub fn run_config(cfg: &FolioConfig) -> Result<()> {
    println!("config file: {}", config::config_path()?.display());
    println!();
    print!("{}", toml::to_string_pretty(cfg)?);
    println!();
    println!("{:<10} {:<9} {:<9} {:<8} {}", "RESOURCE", "AUTH", "ON_FAIL", "ATTEMPTS", "BACKOFF");
    for r in cfg.resource_configs()? {
        println!(
            "{:<10} {:<9} {:<9} {:<8} {}ms..{}ms",
            r.id.as_str(),
            if r.requires_auth { "required" } else { "public" },
            format!("{:?}", r.on_failure).to_lowercase(),
            r.policy.max_attempts,
            r.policy.base_delay.as_millis(),
            r.policy.max_delay.as_millis(),
        );
    }
    Ok(())
}
