//! Scenario replay entry point.
//!
//! # Responsibility
//! - Replay a JSON activation scenario through the core pipeline components.
//! - Print one JSON line per emitted executable-extension list.

mod scenario;

use activation_core::{core_version, default_log_level, init_logging, LoggingConfig};
use clap::Parser;
use scenario::Scenario;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "activation", version, about = "Replay an extension activation scenario")]
struct Cli {
    /// Scenario JSON file.
    scenario: PathBuf,

    /// Log level (trace|debug|info|warn|error).
    #[arg(long, default_value_t = default_log_level().to_string())]
    log_level: String,

    /// Absolute directory for rolling log files; logging is off without it.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir {
        let config = LoggingConfig {
            level: cli.log_level,
            ..LoggingConfig::new(log_dir)
        };
        if let Err(err) = init_logging(&config) {
            eprintln!("activation: {err}");
            return ExitCode::FAILURE;
        }
    }

    let raw = match std::fs::read_to_string(&cli.scenario) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("activation: cannot read {}: {err}", cli.scenario.display());
            return ExitCode::FAILURE;
        }
    };
    let scenario = match Scenario::from_json(&raw) {
        Ok(scenario) => scenario,
        Err(err) => {
            eprintln!("activation: invalid scenario: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!("activation_core version={}", core_version());
    for emission in scenario.replay().await {
        match serde_json::to_string(&emission) {
            Ok(line) => println!("{line}"),
            Err(err) => {
                eprintln!("activation: cannot encode emission: {err}");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
