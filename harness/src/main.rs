//! STS Harness
//!
//! Brings up the SDN controllers named in a harness configuration and reaps
//! them all on SIGINT or SIGTERM.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sts_harness::{HarnessConfig, Supervisor, shutdown_signal};
use sts_logging::StsSubscriberBuilder;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "sts-harness",
    about = "Controller process harness for SDN fuzz testing",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration and print each controller's command line
    Check {
        /// Harness configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Start every controller and keep them running until interrupted
    Run {
        /// Harness configuration file (TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Stop on its own after this many seconds
        #[arg(short, long)]
        duration: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => check(&config),
        Commands::Run { config, duration } => {
            run(&config, cli.verbose, duration.map(Duration::from_secs)).await
        }
    }
}

fn check(path: &Path) -> anyhow::Result<()> {
    let config = HarnessConfig::load(path)?;
    println!("{} controller(s) in {}", config.controllers.len(), path.display());
    for controller in &config.controllers {
        println!(
            "  {:<12} {:<21} {}",
            controller.label(),
            controller.endpoint().to_string(),
            controller.expanded_cmdline()?.join(" ")
        );
    }
    Ok(())
}

async fn run(path: &Path, verbose: bool, limit: Option<Duration>) -> anyhow::Result<()> {
    let config = HarnessConfig::load(path)?;

    let mut builder = StsSubscriberBuilder::new().with_config(config.logging.clone());
    if verbose {
        builder = builder.with_level("debug");
    }
    let _guard = builder.try_init().context("initializing logging")?;

    let mut supervisor = Supervisor::new(config.controllers);
    if let Err(e) = supervisor.start_all().await {
        error!(error = %e, "Failed to start controllers");
        supervisor.shutdown().await;
        return Err(e.into());
    }

    let reason = shutdown_signal(limit).await.context("installing signal handlers")?;
    info!(reason, "Shutting down");
    supervisor.shutdown().await;
    Ok(())
}
