//! OpenFeed CLI and engine binary
//!
//! Entry point for the OpenFeed market data engine. Provides commands
//! for initializing, validating, and starting the engine.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{generate_default_config, load_config, save_config, validate_config};
use market_data::{MarketDataService, MarketUpdate};
use observability::{init_logging, LogFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "openfeed")]
#[command(about = "OpenFeed - simulated market data and options pricing engine")]
#[command(version)]
struct Cli {
    /// Log output format (pretty, json, compact)
    #[arg(long, default_value = "pretty", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the engine with the given configuration
    Start {
        /// Path to the configuration file
        #[arg(short, long, default_value = "openfeed.yaml")]
        config: PathBuf,
    },

    /// Validate configuration without starting the engine
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "openfeed.yaml")]
        config: PathBuf,
    },

    /// Initialize a new configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "openfeed.yaml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging("openfeed", cli.log_format)?;
    debug!(?cli, "CLI arguments parsed");

    match cli.command {
        Commands::Start { config } => start_engine(config).await,
        Commands::Validate { config } => validate_command(config),
        Commands::Init { output } => init_command(output),
    }
}

async fn start_engine<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = load_config(&config_path)?;
    let report = validate_config(&config);

    if !report.warnings.is_empty() {
        warn!("Configuration warnings:");
        for warning in &report.warnings {
            warn!(field = %warning.field, message = %warning.message);
        }
    }

    if !report.is_valid() {
        error!(
            error_count = report.errors.len(),
            "Configuration validation failed"
        );
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot start engine due to configuration errors");
    }

    let symbols = config.enabled_symbols();
    info!(
        engine = %config.engine.name,
        instruments = symbols.len(),
        "Starting market data engine"
    );

    let service = MarketDataService::new(config);
    service.start().await;

    // Subscribe to the whole universe so the engine has live topics to
    // drive; consumers normally attach through the library API.
    let (_id, mut updates) = service.subscribe_to_prices(symbols);

    let logger = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            if let MarketUpdate::Quote(quote) = update {
                debug!(
                    symbol = %quote.symbol,
                    price = quote.price,
                    change_percent = quote.change_percent,
                    "Tick"
                );
            }
        }
    });

    info!("Engine running, press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutdown signal received");
    service.shutdown().await;
    logger.abort();

    Ok(())
}

fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    info!(path = ?config_path.as_ref(), "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Engine: {}", config.engine.name);
    println!("Version: {}", config.engine.version);
    println!("Mode: {:?}", config.engine.mode);
    println!("Instruments: {}", config.instruments.len());
    println!(
        "Session: {} - {} (UTC{:+} min)",
        config.market_hours.open, config.market_hours.close, config.market_hours.timezone_offset_minutes
    );

    Ok(())
}

fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration written to {:?}", output_path);
    println!("Edit it, then run: openfeed start --config {:?}", output_path);

    Ok(())
}
