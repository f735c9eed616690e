mod cli;
mod commands;
mod config;
mod error;
mod pdf;
mod server;
mod storage;
mod upload;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::ServerConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve(args) => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            server::run(ServerConfig::resolve(&args, &cwd)).await?;
        }
        Commands::Split { path, output_dir } => {
            commands::split::run(&path, &output_dir)?;
        }
        Commands::Merge {
            inputs,
            output,
            order,
        } => {
            commands::merge::run(&inputs, &output, order)?;
        }
    }

    Ok(())
}
