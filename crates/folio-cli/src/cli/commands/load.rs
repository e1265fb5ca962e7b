//! `folio load` – load every resource once and print the result.

use anyhow::Result;
use folio_core::config::FolioConfig;

use super::{build_orchestrator, render};
use crate::cli::SourceArgs;

pub async fn run_load(cfg: &FolioConfig, args: &SourceArgs) -> Result<()> {
    let orch = build_orchestrator(cfg, args)?;
    orch.load_data().await;
    orch.wait_idle().await;

    let state = orch.state();
    if args.json {
        println!("{}", render::state_json(&state)?);
    } else {
        print!("{}", render::state_table(&state));
    }
    Ok(())
}
