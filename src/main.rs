use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use nidx::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for nidx::AppCommand {
    fn from(cmd: Commands) -> nidx::AppCommand {
        match cmd {
            Commands::Track {
                amount,
                securities,
                exclusions,
                output_dir,
            } => nidx::AppCommand::Track {
                amount,
                securities,
                exclusions,
                output_dir,
            },
            Commands::Sample => nidx::AppCommand::Sample,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Compute equal-weight buy orders for the index
    Track {
        /// Investment amount in INR (prompted for when omitted)
        #[arg(short, long)]
        amount: Option<f64>,

        /// Path to the securities CSV file
        #[arg(short, long)]
        securities: Option<PathBuf>,

        /// Path to an exclusion list CSV file
        #[arg(short, long)]
        exclusions: Option<PathBuf>,

        /// Directory for the allocation CSV and summary
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Create sample securities and exclusion CSV files
    Sample,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => nidx::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = nidx::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
budget:
  min: 1000.0
  max: 100000000.0

fetch:
  base_url: "https://query1.finance.yahoo.com"
  timeout_secs: 10
  max_retries: 3
  backoff_ms: 1000
  backoff_cap_ms: 8000
  concurrency: 8

universe: "data/nifty100.csv"
output_dir: "data/output"
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
