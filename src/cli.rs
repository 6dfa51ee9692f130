//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::analyzer::report::NO_ANALYSIS;
use crate::analyzer::{render_report, AnalysisResult};
use crate::commands::analyze::{self, AnalyzeRequest};
use crate::commands::history::RecordSelector;
use crate::commands::{config, health, history, keychain, preference};
use crate::settings::AppPaths;

/// AI-assisted roaming analysis of Moxa wireless client logs
#[derive(Parser, Debug)]
#[command(name = "moxa-wifi-analyzer")]
#[command(author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a device log and record the result
    Analyze {
        /// Moxa client log file
        log: PathBuf,
        /// Configuration file to analyze against instead of the current one
        #[arg(long)]
        config: Option<PathBuf>,
        /// Also save the report (.json for JSON, anything else for text)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Completion model
        #[arg(long)]
        model: Option<String>,
        /// Request timeout in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,
        /// Maximum number of log characters sent
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        limit: Option<u64>,
    },

    /// Print the prompt an analysis would send, without calling the service
    Prompt {
        log: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        limit: Option<u64>,
    },

    /// Show the report of a recorded analysis
    Report {
        /// Analysis ID or "latest"
        #[arg(default_value = "latest")]
        analysis: RecordSelector,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply a recorded analysis' changes to the current configuration
    Apply {
        /// Analysis ID or "latest"
        #[arg(default_value = "latest")]
        analysis: RecordSelector,
        /// Also write the updated configuration to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage the current device configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Manage the OpenAI API key
    #[command(subcommand)]
    Key(KeyCommand),

    /// Read or change preferences
    #[command(subcommand)]
    Pref(PrefCommand),

    /// Browse past analyses
    #[command(subcommand)]
    History(HistoryCommand),

    /// Check credentials, preferences and storage
    Health,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the current configuration
    Show,
    /// Replace the current configuration with the Moxa defaults
    Reset,
    /// Change one parameter, e.g. roaming_difference=8
    Set { assignment: String },
    /// Import a configuration file as the current configuration
    Load { file: PathBuf },
    /// Save the current configuration to a file
    Save { file: PathBuf },
    /// List parameters that differ from the ideal values
    Ideal,
}

#[derive(Subcommand, Debug)]
pub enum KeyCommand {
    /// Store the API key in the system keychain
    Set { key: String },
    /// Report where an API key is available
    Status,
    /// Remove the keychain entry
    Delete,
}

#[derive(Subcommand, Debug)]
pub enum PrefCommand {
    /// Print a preference (model, api_base_url, timeout_secs, truncation_limit)
    Get { key: String },
    Set { key: String, value: String },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// List recent analyses
    List {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Print a recorded analysis as JSON
    Show { id: i64 },
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Failed to serialize output: {}", e))
}

fn summary_line(id: i64, result: &AnalysisResult) -> String {
    if result.is_error() {
        format!(
            "Analysis {} failed: {}",
            id,
            result.error_message.as_deref().unwrap_or("unknown error")
        )
    } else {
        format!(
            "Analysis {} recorded: {}% - {}",
            id,
            result.score_percent(),
            result.status
        )
    }
}

/// Run one parsed command, printing its output to stdout.
pub async fn execute(command: Command, paths: &AppPaths) -> Result<(), String> {
    match command {
        Command::Analyze {
            log,
            config,
            output,
            model,
            timeout,
            limit,
        } => {
            let request = AnalyzeRequest {
                log_path: log,
                config_path: config,
                output,
                model,
                timeout_secs: timeout,
                truncation_limit: limit.map(|l| l as usize),
            };
            let outcome = analyze::analyze_log(paths, request).await?;
            let report = render_report(&outcome.result);
            if report != NO_ANALYSIS {
                println!("{}", report);
            }
            println!("{}", summary_line(outcome.id, &outcome.result));
        }
        Command::Prompt { log, config, limit } => {
            let prompt = analyze::compose_prompt(
                paths,
                &log,
                config.as_deref(),
                limit.map(|l| l as usize),
            )?;
            println!("{}", prompt);
        }
        Command::Report { analysis, output } => {
            let report = analyze::report_analysis(paths, analysis, output.as_deref()).await?;
            println!("{}", report);
        }
        Command::Apply { analysis, output } => {
            let outcome =
                analyze::apply_recommendations(paths, analysis, output.as_deref()).await?;
            for change in &outcome.applied {
                if let Some(value) = &change.recommended_value {
                    println!("{}: {} -> {}", change.parameter, change.current_value, value);
                }
            }
            println!(
                "Applied {} changes from analysis {} to {}",
                outcome.applied.len(),
                outcome.id,
                paths.device_config_file().display()
            );
        }
        Command::Config(cmd) => match cmd {
            ConfigCommand::Show => println!("{}", config::show_config(paths)?.to_pretty_json()),
            ConfigCommand::Reset => {
                config::reset_config(paths)?;
                println!("Configuration reset to defaults");
            }
            ConfigCommand::Set { assignment } => {
                let (key, value) = config::set_config_value(paths, &assignment)?;
                println!("{} = {}", key, value);
            }
            ConfigCommand::Load { file } => {
                let loaded = config::import_config(paths, &file)?;
                println!("Loaded {} parameters from {}", loaded.len(), file.display());
            }
            ConfigCommand::Save { file } => {
                let saved = config::export_config(paths, &file)?;
                println!("Saved {} parameters to {}", saved.len(), file.display());
            }
            ConfigCommand::Ideal => {
                let differences = config::ideal_differences(paths)?;
                if differences.is_empty() {
                    println!("Current configuration matches the ideal parameters");
                }
                for diff in differences {
                    match diff.current {
                        Some(current) => {
                            println!("{}: {} -> {}", diff.parameter, current, diff.ideal)
                        }
                        None => println!("{}: (unset) -> {}", diff.parameter, diff.ideal),
                    }
                }
            }
        },
        Command::Key(cmd) => match cmd {
            KeyCommand::Set { key } => {
                keychain::set_api_key(&key)?;
                println!("API key stored in keychain");
            }
            KeyCommand::Status => println!("API key {}", keychain::api_key_status()?.describe()),
            KeyCommand::Delete => {
                keychain::delete_api_key()?;
                println!("API key removed from keychain");
            }
        },
        Command::Pref(cmd) => match cmd {
            PrefCommand::Get { key } => match preference::get_preference(paths, &key)? {
                Some(value) => println!("{}", value),
                None => println!("{} is not set", key),
            },
            PrefCommand::Set { key, value } => {
                preference::set_preference(paths, &key, &value)?;
                println!("{} = {}", key, value);
            }
        },
        Command::History(cmd) => match cmd {
            HistoryCommand::List { limit } => {
                let rows = history::list_history(paths, limit).await?;
                println!("{}", history::format_history_table(&rows).trim_end());
            }
            HistoryCommand::Show { id } => {
                let record = history::show_history(paths, id).await?;
                println!("{}", to_json(&record)?);
            }
        },
        Command::Health => {
            let report = health::run_health_check(paths).await?;
            println!("{}", to_json(&report)?);
            if !report.is_healthy() {
                return Err("Health check found problems".to_string());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze_flags() {
        let cli = Cli::try_parse_from([
            "moxa-wifi-analyzer",
            "analyze",
            "client.log",
            "--model",
            "gpt-4o",
            "--limit",
            "5000",
            "-o",
            "out.json",
        ])
        .unwrap();
        match cli.command {
            Command::Analyze {
                log,
                model,
                limit,
                output,
                ..
            } => {
                assert_eq!(log, PathBuf::from("client.log"));
                assert_eq!(model.as_deref(), Some("gpt-4o"));
                assert_eq!(limit, Some(5000));
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_report_defaults_to_latest() {
        let cli = Cli::try_parse_from(["moxa-wifi-analyzer", "report"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Report {
                analysis: RecordSelector::Latest,
                output: None
            }
        ));

        let cli = Cli::try_parse_from(["moxa-wifi-analyzer", "apply", "7", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Command::Apply {
                analysis: RecordSelector::Id(7),
                ..
            }
        ));
    }

    #[test]
    fn test_zero_limit_rejected() {
        assert!(Cli::try_parse_from(["moxa-wifi-analyzer", "prompt", "a.log", "--limit", "0"]).is_err());
        assert!(Cli::try_parse_from(["moxa-wifi-analyzer", "report", "abc"]).is_err());
    }

    #[test]
    fn test_config_ideal_parses() {
        let cli = Cli::try_parse_from(["moxa-wifi-analyzer", "config", "ideal"]).unwrap();
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Ideal)));
    }

    #[test]
    fn test_config_set_parses() {
        let cli = Cli::try_parse_from(["moxa-wifi-analyzer", "config", "set", "channel=36"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Set { ref assignment }) if assignment == "channel=36"
        ));
    }
}
