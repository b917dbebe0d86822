pub mod cli;
pub mod config;
pub mod core;
pub mod log;
pub mod providers;
pub mod report;
pub mod universe;

use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

pub enum AppCommand {
    Track {
        amount: Option<f64>,
        securities: Option<PathBuf>,
        exclusions: Option<PathBuf>,
        output_dir: Option<PathBuf>,
    },
    Sample,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load_or_default()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Track {
            amount,
            securities,
            exclusions,
            output_dir,
        } => {
            cli::track::run(
                &config,
                cli::track::TrackOptions {
                    amount,
                    securities,
                    exclusions,
                    output_dir,
                },
            )
            .await
        }
        AppCommand::Sample => cli::sample::run(&config),
    }
}
