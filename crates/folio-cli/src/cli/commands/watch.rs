//! `folio watch` – print every presentation state update until loading settles.

use anyhow::Result;
use folio_core::config::FolioConfig;

use super::{build_orchestrator, render};
use crate::cli::SourceArgs;

pub async fn run_watch(cfg: &FolioConfig, args: &SourceArgs) -> Result<()> {
    let orch = build_orchestrator(cfg, args)?;
    let mut rx = orch.observe();
    orch.load_data().await;

    let mut update = 0u32;
    loop {
        let state = rx.borrow_and_update().clone();
        update += 1;
        if args.json {
            println!("{}", render::state_json_line(&state)?);
        } else {
            println!("-- update {} --", update);
            print!("{}", render::state_table(&state));
        }
        if !state.any_loading() {
            break;
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, cancelling");
                orch.cancel();
                eprintln!("cancelled");
                break;
            }
        }
    }
    Ok(())
}
