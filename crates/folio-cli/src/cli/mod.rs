//! CLI for the Folio portfolio client.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use folio_core::config;

use commands::{run_config, run_load, run_watch};

/// Top-level CLI for the Folio portfolio client.
#[derive(Debug, Parser)]
#[command(name = "folio")]
#[command(about = "Folio: load portfolio and market data with retry and fallback", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Where to load from and how to print it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct SourceArgs {
    /// Bearer token for the signed-in user. Without it only public resources load.
    #[arg(long, env = "FOLIO_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Override `api_base_url` from the config file.
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Print presentation state as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Load every resource once and print the final state.
    Load(SourceArgs),

    /// Load every resource and print each state update as it arrives.
    Watch(SourceArgs),

    /// Show the config file path and the effective configuration.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Load(args) => run_load(&cfg, &args).await?,
            CliCommand::Watch(args) => run_watch(&cfg, &args).await?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}
