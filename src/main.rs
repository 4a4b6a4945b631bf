use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wirehub_cli::load_config;

mod cli;

use cli::config::{cmd_config, ConfigArgs};
use cli::serve::{cmd_serve, ServeArgs};

/// Wirehub - JSON wire protocol server
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (overrides `logging.level` from the config file)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the wire protocol server
    Serve(ServeArgs),

    /// Inspect configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = load_config(cli.config.as_deref()).await?;
    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&loaded.config.logging.level);
    init_logging(level, cli.debug)?;

    info!("Starting wirehub v{}", env!("CARGO_PKG_VERSION"));
    if loaded.from_file {
        info!("Loaded configuration from: {}", loaded.path.display());
    } else {
        debug!(
            "Config file not found, using defaults: {}",
            loaded.path.display()
        );
    }

    match cli.command {
        Commands::Serve(args) => cmd_serve(args, loaded.config).await,
        Commands::Config(args) => cmd_config(args, &loaded),
    }
}

fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}
