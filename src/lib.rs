//! Roaming analysis of Moxa wireless client logs through an LLM.
//!
//! A run composes a prompt from the device log and its configuration, sends
//! it to an OpenAI-style completion endpoint, normalizes the answer into an
//! [`analyzer::AnalysisResult`] and records it in a local SQLite history.

pub mod analyzer;
pub mod cli;
pub mod commands;
pub mod device;
mod error;
pub mod history;
pub mod settings;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub use analyzer::{AnalysisResult, AnalysisStatus, Analyzer, ConfigChange, RoamingMetrics};
pub use device::DeviceConfig;
pub use error::AnalyzerError;
pub use history::{AnalysisHistory, AnalysisRecord, AnalysisSummary};

pub async fn run() -> ExitCode {
    let cli = cli::Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let paths = match settings::AppPaths::detect() {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli::execute(cli.command, &paths).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}
