//! CLI command handlers, one file per command.

mod config;
mod load;
mod render;
mod watch;

pub use config::run_config;
pub use load::run_load;
pub use watch::run_watch;

use std::sync::Arc;

use anyhow::Result;
use folio_core::config::FolioConfig;
use folio_core::{FetchOrchestrator, HttpDataSource, MemorySessionProvider, Session};

use super::SourceArgs;

/// Orchestrator over the HTTP source, configured from `cfg` and `args`.
pub(crate) fn build_orchestrator(cfg: &FolioConfig, args: &SourceArgs) -> Result<FetchOrchestrator> {
    let base_url = args.base_url.as_deref().unwrap_or(&cfg.api_base_url);
    let source = HttpDataSource::new(base_url, cfg.connect_timeout(), cfg.request_timeout())?;
    let session = match &args.token {
        Some(token) => Session::authenticated(token.clone()),
        None => Session::anonymous(),
    };
    let resources = cfg.resource_configs()?;
    tracing::debug!(base_url, authenticated = session.is_authenticated, "building orchestrator");
    Ok(FetchOrchestrator::new(
        Arc::new(source),
        Arc::new(MemorySessionProvider::new(session)),
        resources,
    ))
}
