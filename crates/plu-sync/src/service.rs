//! # Export Service
//!
//! Runs export cycles on a fixed interval and owns the connection.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Service States                                   │
//! │                                                                         │
//! │   start                                                                 │
//! │     │                                                                   │
//! │     ▼          connect ok                                               │
//! │  ┌──────────────┐ ─────────► ┌───────────────┐                          │
//! │  │ Disconnected │            │ ConnectedIdle │◄─────────────┐           │
//! │  └──────────────┘ ◄───┐      └───────┬───────┘              │           │
//! │     ▲  connect fails  │              │ tick                 │           │
//! │     │  (wait interval)│              ▼                      │           │
//! │     │                 │      ┌───────────────┐   Unchanged, │           │
//! │     │                 └───── │   Exporting   │ ─ exported, ─┘           │
//! │     │   data-source error    └───────┬───────┘   write/config error     │
//! │     │                                │                                  │
//! │     └────────────────────────────────┘                                  │
//! │        internal error or panic (wait fault cooldown)                    │
//! │                                                                         │
//! │  No backoff growth: every wait is the fixed interval, except the       │
//! │  cooldown after a fault.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use futures_util::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::ExporterConfig;
use crate::error::{SyncError, SyncResult};
use crate::exporter::{CycleOutcome, CycleReport, Exporter};
use crate::source::{ConnectionProvider, DataSource};

// =============================================================================
// Service State
// =============================================================================

/// Where the service is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// No live connection; the next tick tries to connect.
    Disconnected,
    /// Connected, waiting for the next tick.
    ConnectedIdle,
    /// A cycle is running.
    Exporting,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Disconnected => write!(f, "disconnected"),
            ServiceState::ConnectedIdle => write!(f, "connected_idle"),
            ServiceState::Exporting => write!(f, "exporting"),
        }
    }
}

// =============================================================================
// Export Service
// =============================================================================

/// Fixed-interval export loop over one connection provider.
pub struct ExportService<P: ConnectionProvider> {
    provider: P,
    exporter: Exporter,
    source: Option<P::Source>,
    state: ServiceState,
    interval: Duration,
    fault_cooldown: Duration,
}

impl<P: ConnectionProvider> ExportService<P> {
    pub fn new(provider: P, exporter: Exporter, interval: Duration, fault_cooldown: Duration) -> Self {
        ExportService {
            provider,
            exporter,
            source: None,
            state: ServiceState::Disconnected,
            interval,
            fault_cooldown,
        }
    }

    /// Builds the service from validated configuration.
    pub fn from_config(provider: P, config: &ExporterConfig) -> SyncResult<Self> {
        Ok(Self::new(
            provider,
            Exporter::from_config(config)?,
            config.check_interval(),
            config.fault_cooldown(),
        ))
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn exporter(&self) -> &Exporter {
        &self.exporter
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Connects if there is no live connection.
    ///
    /// ## Errors
    /// The provider's error; the service stays `Disconnected`.
    pub async fn ensure_connected(&mut self) -> SyncResult<()> {
        if self.source.is_some() {
            return Ok(());
        }

        match self.provider.connect().await {
            Ok(source) => {
                info!("Connected to data source");
                self.source = Some(source);
                self.state = ServiceState::ConnectedIdle;
                Ok(())
            }
            Err(e) => {
                self.state = ServiceState::Disconnected;
                Err(e)
            }
        }
    }

    /// Drops the connection; the next tick reconnects.
    pub async fn disconnect(&mut self) {
        if let Some(source) = self.source.take() {
            source.close().await;
            debug!("Data source closed");
        }
        self.state = ServiceState::Disconnected;
    }

    /// One tick: connect if needed, then run one export cycle.
    pub async fn tick(&mut self) -> SyncResult<CycleReport> {
        self.ensure_connected().await?;

        let source = self
            .source
            .as_ref()
            .ok_or_else(|| SyncError::Internal("no data source after connect".into()))?;

        self.state = ServiceState::Exporting;
        let result = self.exporter.run_cycle(source).await;

        match &result {
            Err(e) if e.is_data_source_error() || e.is_fault() => self.disconnect().await,
            _ => self.state = ServiceState::ConnectedIdle,
        }

        result
    }

    /// A guarded tick: logs the result, isolates panics and returns how long
    /// to wait before the next one.
    pub async fn step(&mut self) -> Duration {
        let outcome = AssertUnwindSafe(self.tick()).catch_unwind().await;

        match outcome {
            Ok(Ok(report)) => {
                match report.outcome {
                    CycleOutcome::Unchanged => debug!("No changes detected"),
                    CycleOutcome::NoProducts => info!("Changes detected, nothing to export"),
                    CycleOutcome::Exported => info!(
                        records = report.written.records,
                        skipped = report.skipped.len(),
                        "Export cycle complete"
                    ),
                }
                self.interval
            }
            Ok(Err(e)) if e.is_fault() => {
                error!(error = %e, cooldown_secs = self.fault_cooldown.as_secs(), "Unexpected fault");
                self.fault_cooldown
            }
            Ok(Err(e)) if e.is_data_source_error() => {
                warn!(error = %e, "Data source unavailable, reconnecting next cycle");
                self.interval
            }
            Ok(Err(e)) => {
                error!(error = %e, "Export cycle failed");
                self.interval
            }
            Err(panic) => {
                error!(
                    panic = %panic_message(panic.as_ref()),
                    cooldown_secs = self.fault_cooldown.as_secs(),
                    "Export cycle panicked"
                );
                self.disconnect().await;
                self.fault_cooldown
            }
        }
    }

    /// Runs until `shutdown` resolves.
    ///
    /// The first tick runs immediately, so the first connection attempt is
    /// made at start. Shutdown is observed between ticks.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            interval_secs = self.interval.as_secs(),
            "Export service started"
        );

        tokio::pin!(shutdown);

        loop {
            let delay = self.step().await;

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.disconnect().await;
        info!("Export service stopped");
    }

    /// Runs a single tick and releases the connection.
    pub async fn run_once(&mut self) -> SyncResult<CycleReport> {
        let result = self.tick().await;
        self.disconnect().await;
        result
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
