mod artifacts;
mod categories;
mod commands;
mod config;
mod github;
mod llm;
mod pipeline;
mod prompts;
mod render;
mod state;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Credentials live in the env file; a missing file just means plain env vars
    if let Err(e) = dotenv::from_path(&cli.env) {
        info!(path = %cli.env.display(), "No env file loaded: {}", e);
    }

    info!("Starting issue-sentinel pipeline");
    if let Err(e) = commands::dispatch(cli).await {
        error!("Pipeline run failed: {:#}", e);
        return Err(e);
    }

    Ok(())
}
