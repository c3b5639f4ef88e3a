//! Autopool Risk - rebalance risk engine for LST autopools
//!
//! Replays recorded market scenarios through the engine and scores
//! individual destinations from the command line.

use anyhow::Result;
use clap::{Parser, Subcommand};
use ethnum::U256;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

// Use the library crate
use autopool_risk::cli::commands;
use autopool_risk::config::Config;
use autopool_risk::strategy::RebalanceDirection;
use autopool_risk::types::Destination;

/// Autopool Risk - rebalance risk engine
#[derive(Parser)]
#[command(name = "autopool-risk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml", env = "AUTOPOOL_CONFIG")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario through a fresh engine
    Replay {
        /// Scenario JSON file
        scenario: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score one destination of a scenario's market
    Score {
        /// Scenario JSON file
        scenario: PathBuf,

        /// Destination address, or "idle"
        #[arg(long)]
        destination: Destination,

        /// Rebalance direction: in or out
        #[arg(long, default_value = "in")]
        direction: RebalanceDirection,

        /// Amount moved, in the destination token's base units
        #[arg(long, default_value = "0", value_parser = parse_u256)]
        amount: U256,

        /// Evaluation timestamp (default: scenario start)
        #[arg(long)]
        at: Option<u64>,
    },

    /// Show current configuration
    Config,
}

fn parse_u256(s: &str) -> std::result::Result<U256, String> {
    U256::from_str_radix(s.trim(), 10).map_err(|e| format!("invalid amount '{}': {}", s, e))
}

fn init_tracing(config: &Config) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(config.log_directive().parse()?);

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .init();
    }
    Ok(())
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize tracing
    init_tracing(&config)?;

    // Execute command
    let result = match cli.command {
        Commands::Replay { scenario, json } => commands::replay(&config, &scenario, json),
        Commands::Score {
            scenario,
            destination,
            direction,
            amount,
            at,
        } => commands::score(&config, &scenario, destination, direction, amount, at),
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
