//! Electroplater host application
//!
//! Runs next to the printer host. When a print finishes it positions the
//! anode over the printed cup, primes electrolyte, plates for the configured
//! time and shuts the station down safely.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod hw;

/// Post-print electroplating controller
#[derive(Parser, Debug)]
#[command(name = "electroplater")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "electroplater.toml")]
    config: PathBuf,

    /// Log filter (overrides RUST_LOG)
    #[arg(long)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Wait for events on stdin (print-done, stop, status, ack, quit)
    Run,
    /// Plate now as if a print had just finished
    Plate,
    /// Run the safety shutdown once
    Shutdown,
    /// Show power supply identity and live readings
    Identify,
}

fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(filter) => EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_filter.as_deref());

    let app = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Run => commands::run(&cli.config, &app),
        Commands::Plate => commands::plate(&app),
        Commands::Shutdown => commands::shutdown(&app),
        Commands::Identify => commands::identify(&app),
    }
}
