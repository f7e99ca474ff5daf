use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio::sync::mpsc;
use vmrestored::{adapters, config, context, core::Orchestrator, logging};

#[derive(Parser)]
#[command(name = "vmrestored")]
#[command(about = "Backup catalog and restore daemon for virtualization platforms", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Daemon(DaemonArgs),
}

#[derive(Args, Serialize)]
struct DaemonArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    platform_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    registry_poll_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    verbose: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    log_json: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    simulation: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.command {
        Commands::Daemon(args) => config::AppConfig::new(Some(args))?,
    };

    logging::init(logging::LogConfig {
        json: config.log_json,
        verbose: config.verbose,
    });

    match &cli.command {
        Commands::Daemon(_) => run_daemon(config).await.context("Failed to start daemon")?,
    }

    Ok(())
}

async fn run_daemon(config: config::AppConfig) -> Result<()> {
    let ctx = context::AppContext::new(config);
    let (commands_tx, commands_rx) = mpsc::channel(32);
    let platform = adapters::get_platform(&ctx.config, commands_tx);

    Orchestrator::new(&ctx, platform).start(commands_rx).await
}
