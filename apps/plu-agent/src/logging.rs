//! Log setup: console (stderr) plus a daily-rotated file.

use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info,plu=debug,sqlx=warn";

/// Log file name; the appender adds `.YYYY-MM-DD`.
const LOG_FILE_PREFIX: &str = "plu-agent.log";

/// Platform log directory.
///
/// - **Windows**: `%APPDATA%\plu\plu-sync\data\logs`
/// - **Linux**: `~/.local/share/plu-sync/logs`
pub fn default_log_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "plu", "plu-sync")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// whole process.
pub fn init(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(log_dir)
        .context("Failed to open log file")?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init()
        .context("Failed to initialize tracing")?;

    Ok(guard)
}
