//! Pool simulator entry point

use anyhow::Result;
use clap::Parser;
use pool_config::PoolConfig;
use pool_simulator::{init_tracing, run};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment overlay under `environments/` next to the config file
    #[arg(short, long)]
    environment: Option<String>,

    /// Log filter, overrides `logging.level`
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = PoolConfig::load(args.config.as_deref(), args.environment.as_deref())?;
    config.expand_env_vars()?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.json_logs {
        config.logging.json = true;
    }
    config.validate()?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    init_tracing(&config.logging)?;
    info!("Starting pool simulator");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    match run(&config).await {
        Ok(report) => {
            info!(
                swaps = report.swap_outputs.len(),
                events = report.events.len(),
                failed = report.commands_failed,
                "seed scenario finished"
            );
            Ok(())
        }
        Err(e) => {
            error!("Simulation failed: {:#}", e);
            Err(e)
        }
    }
}
