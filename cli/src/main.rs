// lnpay CLI
// Runs the `pay` command against scripted payment scenarios

mod commands;
mod scenario;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lnpay_core::LnPayConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lnpay-cli")]
#[command(about = "Lightning payment attempt runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); LNPAY_* environment variables override it
    #[arg(short, long, global = true, env = "LNPAY_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level regardless of configuration
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Pay the invoice of a scenario file
    Pay(commands::pay::PayArgs),

    /// Show the effective configuration
    Config,
}

fn init_logging(config: &LnPayConfig, debug: bool) {
    // RUST_LOG wins over the configured level
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = LnPayConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config, cli.debug);

    match cli.command {
        Commands::Pay(args) => {
            let response = commands::pay::execute(&args, &config).await?;
            eprintln!("{}", commands::pay::summary(&response));
            println!("{}", serde_json::to_string_pretty(&response)?);
            if response.error.is_some() {
                std::process::exit(1);
            }
        }
        Commands::Config => commands::config::show(&config)?,
    }

    Ok(())
}
