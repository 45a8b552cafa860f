//! # PLU Agent
//!
//! Keeps the scale's PLU file in step with the EasyTrade back office.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          plu-agent                                      │
//! │                                                                         │
//! │  CLI (clap) ──► ExporterConfig::load ──► ExportService<MySqlProvider>  │
//! │                                              │                          │
//! │                    run-once: one tick ◄──────┤                          │
//! │                    service:  loop until ─────┘                          │
//! │                              Ctrl+C / SIGTERM                           │
//! │                                                                         │
//! │  Logs: stderr + <log_dir>/plu-agent.log.YYYY-MM-DD                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod logging;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use plu_sync::{CycleOutcome, ExportService, ExporterConfig, MySqlProvider};

/// Exports EasyTrade goods and prices to the label scale PLU file.
#[derive(Parser, Debug)]
#[command(name = "plu-agent")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (created with defaults if missing)
    #[arg(short, long, global = true, env = "PLU_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for the daily log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single export cycle and exit
    RunOnce {
        /// Print the cycle report as JSON on stdout
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Poll for changes until stopped
    Service,
    /// Print the effective configuration (password hidden)
    ShowConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_dir = cli.log_dir.clone().unwrap_or_else(logging::default_log_dir);
    let _guard = logging::init(&log_dir)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting plu-agent");

    let config = ExporterConfig::load(cli.config.clone()).context("Unusable configuration")?;
    info!(
        host = %config.database.host,
        database = %config.database.database,
        plu_file = %config.export.plu_file_path.display(),
        interval_secs = config.export.check_time_secs,
        price_mode = %config.price_mode(),
        format = %config.export.format_version,
        "Configuration loaded"
    );

    match cli.command {
        Command::ShowConfig => {
            print!("{}", toml::to_string_pretty(&config.redacted())?);
            Ok(ExitCode::SUCCESS)
        }
        Command::RunOnce { json } => run_once(&config, json).await,
        Command::Service => {
            let mut service = ExportService::from_config(provider(&config), &config)?;
            service.run(shutdown_signal()).await;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn provider(config: &ExporterConfig) -> MySqlProvider {
    MySqlProvider::new(config.db_config(), config.database.reset_query_cache)
}

async fn run_once(config: &ExporterConfig, json: bool) -> anyhow::Result<ExitCode> {
    let mut service = ExportService::from_config(provider(config), config)?;

    match service.run_once().await {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            match report.outcome {
                CycleOutcome::Exported => info!(records = report.written.records, "Done"),
                CycleOutcome::NoProducts => info!("Done, nothing to export"),
                CycleOutcome::Unchanged => info!("Done, no changes"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(error = %e, "Export cycle failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping after the current cycle...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_once_json() {
        let cli = Cli::try_parse_from(["plu-agent", "--config", "plu.toml", "run-once", "--json"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("plu.toml")));
        assert!(matches!(cli.command, Command::RunOnce { json: true }));
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["plu-agent"]).is_err());
        assert!(Cli::try_parse_from(["plu-agent", "export-everything"]).is_err());
    }
}
