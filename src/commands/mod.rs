mod stages;
mod status;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::state::AppState;

/// Issue Sentinel - issue-tracker health pipeline
#[derive(Debug, Parser)]
#[command(name = "issue-sentinel", version, about)]
pub struct Cli {
    /// Pipeline settings (targets, capture window, data directory)
    #[arg(long, global = true, default_value = "config/settings.yaml")]
    pub config: PathBuf,

    /// Environment file with API credentials
    #[arg(long, global = true, default_value = "config/.env")]
    pub env: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Query the search API for every target and save raw captures
    Capture,
    /// Turn raw captures into processed tables
    Normalize {
        /// Also normalize captures that were already processed
        #[arg(long)]
        reprocess: bool,
    },
    /// Classify processed tables into enriched tables
    Enrich {
        /// Enrich every processed table, not only the latest per source
        #[arg(long)]
        all: bool,
    },
    /// Score enriched tables, print the ranking and render plots
    Analyze,
    /// Run capture, normalize, enrich and analyze in order
    Run,
    /// Show what exists on disk for each source
    Status {
        /// Print the manifest as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn dispatch(cli: Cli) -> Result<()> {
    let state = AppState::load(&cli.config)?;
    info!(data_dir = %state.store.root().display(), "Settings loaded");

    match cli.command {
        Command::Capture => stages::capture(&state).await,
        Command::Normalize { reprocess } => stages::normalize(&state, reprocess),
        Command::Enrich { all } => stages::enrich(&state, all).await,
        Command::Analyze => stages::analyze(&state),
        Command::Run => {
            stages::capture(&state).await?;
            stages::normalize(&state, false)?;
            stages::enrich(&state, false).await?;
            stages::analyze(&state)
        }
        Command::Status { json } => status::status(&state, json),
    }
}
