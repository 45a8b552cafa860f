//! # plu-sync: Export Engine for PLU Sync
//!
//! This crate keeps the scale's PLU file in step with the EasyTrade back
//! office: it polls for changes and rewrites the file when anything moved.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Export Engine Architecture                       │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 ExportService (fixed-interval loop)              │  │
//! │  │                                                                  │  │
//! │  │  Disconnected ⇄ ConnectedIdle ⇄ Exporting                        │  │
//! │  │  Owns the ConnectionProvider and the live DataSource             │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │ tick                                    │
//! │                               ▼                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Exporter (one cycle)                        │  │
//! │  └───────┬──────────────────────┬──────────────────────┬────────────┘  │
//! │          ▼                      ▼                      ▼               │
//! │  ┌────────────────┐  ┌────────────────────┐  ┌────────────────────┐    │
//! │  │ ChangeDetector │  │ RecordTransformer  │  │  PluFileWriter     │    │
//! │  │                │  │ (plu-core)         │  │                    │    │
//! │  │ MAX timestamps │  │ units, prices,     │  │ windows-1251,      │    │
//! │  │ vs last export │  │ articul, hotkey    │  │ atomic replace     │    │
//! │  └────────────────┘  └────────────────────┘  └────────────────────┘    │
//! │                                                                         │
//! │  DataSource implementations: MySqlSource (plu-db), MemorySource        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - TOML configuration, defaults, environment overrides
//! - [`detector`] - Change detection against the last export
//! - [`error`] - Sync error types
//! - [`exporter`] - One detect → fetch → transform → write cycle
//! - [`memory`] - In-memory data source
//! - [`service`] - Service loop with reconnect and fault cooldown
//! - [`source`] - `DataSource` / `ConnectionProvider` traits, MySQL implementation
//! - [`writer`] - PLU file encoding and atomic replacement
//!
//! ## Usage
//!
//! ```rust,ignore
//! use plu_sync::{ExportService, ExporterConfig, MySqlProvider};
//!
//! let config = ExporterConfig::load(None)?;
//! let provider = MySqlProvider::new(config.db_config(), config.database.reset_query_cache);
//!
//! let mut service = ExportService::from_config(provider, &config)?;
//! service.run(shutdown_signal()).await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod detector;
pub mod error;
pub mod exporter;
pub mod memory;
pub mod service;
pub mod source;
pub mod writer;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DatabaseSettings, ExportSettings, ExporterConfig, PriceScaling};
pub use detector::ChangeDetector;
pub use error::{SyncError, SyncResult};
pub use exporter::{CycleOutcome, CycleReport, Exporter, SkippedRow};
pub use memory::{FailurePoint, MemoryProduct, MemoryProvider, MemorySource};
pub use service::{ExportService, ServiceState};
pub use source::{ConnectionProvider, DataSource, MySqlProvider, MySqlSource};
pub use writer::{LineEnding, PluFileWriter, WriteStats};
