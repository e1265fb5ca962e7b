use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::resource::{FailurePolicy, ResourceConfig, ResourceId};
use crate::retry::{RetryError, RetryPolicy};

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per load (including the first).
    pub max_attempts: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub base_delay_ms: u64,
    /// Maximum backoff delay in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 2000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    /// Validated retry policy.
    pub fn to_policy(&self) -> Result<RetryPolicy, RetryError> {
        let policy = RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        );
        policy.validate()?;
        Ok(policy)
    }
}

/// Per-resource overrides. Unset fields keep the built-in default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceOverride {
    pub retry: Option<RetryConfig>,
    /// "fallback" substitutes static data; "fail" surfaces the error.
    pub on_failure: Option<FailurePolicy>,
    pub requires_auth: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    pub portfolio: Option<ResourceOverride>,
    pub trending: Option<ResourceOverride>,
}

impl ResourcesConfig {
    fn get(&self, id: ResourceId) -> Option<&ResourceOverride> {
        match id {
            ResourceId::Portfolio => self.portfolio.as_ref(),
            ResourceId::Trending => self.trending.as_ref(),
        }
    }
}

/// Global configuration loaded from `~/.config/folio/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolioConfig {
    /// Root of the portfolio API; resource paths are joined onto it.
    pub api_base_url: String,
    /// TCP/TLS connect timeout per request, in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout, in seconds.
    pub request_timeout_secs: u64,
    /// Retry policy for every resource; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    /// Optional per-resource overrides.
    #[serde(default)]
    pub resources: Option<ResourcesConfig>,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.folio.example/v1/".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            retry: None,
            resources: None,
        }
    }
}

impl FolioConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolve the load configuration of every resource: built-in defaults,
    /// then the global `[retry]` section, then `[resources.<name>]`.
    pub fn resource_configs(&self) -> Result<Vec<ResourceConfig>> {
        ResourceId::ALL
            .into_iter()
            .map(|id| self.resource_config(id))
            .collect()
    }

    fn resource_config(&self, id: ResourceId) -> Result<ResourceConfig> {
        let mut cfg = ResourceConfig::defaults_for(id);
        if let Some(retry) = &self.retry {
            cfg.policy = retry
                .to_policy()
                .with_context(|| format!("[retry] section (applies to {})", id))?;
        }
        let overrides = self.resources.as_ref().and_then(|r| r.get(id));
        if let Some(o) = overrides {
            if let Some(retry) = &o.retry {
                cfg.policy = retry
                    .to_policy()
                    .with_context(|| format!("[resources.{}.retry] section", id))?;
            }
            if let Some(on_failure) = o.on_failure {
                cfg.on_failure = on_failure;
            }
            if let Some(requires_auth) = o.requires_auth {
                cfg.requires_auth = requires_auth;
            }
        }
        Ok(cfg)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("folio")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FolioConfig> {
    load_or_init_at(&config_path()?)
}

/// Like [`load_or_init`] for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<FolioConfig> {
    if !path.exists() {
        let default_cfg = FolioConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: FolioConfig =
        toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
