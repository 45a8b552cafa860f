//! # Sync Error Types
//!
//! Error types for export cycles and the service loop.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Data Source   │  │     Output              │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Config         │  │  Connection     │  │  Write                  │ │
//! │  │                 │  │  Query          │  │                         │ │
//! │  │                 │  │  EmptyChangeSet │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │         │                     │                        │                │
//! │         ▼                     ▼                        ▼                │
//! │   stay connected       drop connection,         stay connected,        │
//! │   retry next tick      reconnect next tick      state not advanced     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Internal (or a panic inside a cycle)                          │   │
//! │  │     → drop connection, extended cooldown                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Row-level problems are not `SyncError`s: a [`plu_core::TransformError`]
//! skips the row and ends up in the cycle report.

use std::path::PathBuf;
use thiserror::Error;

use plu_core::{ChangeError, ChangeSet, ValidationError};

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering every failure of a cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Malformed or semantically invalid settings.
    ///
    /// ## When This Occurs
    /// - Validation failure at startup (fatal)
    /// - Empty unit set when a cycle builds its query (per cycle)
    #[error("Invalid configuration: {0}")]
    Config(String),

    // =========================================================================
    // Data Source Errors
    // =========================================================================
    /// Data source unreachable or connection lost.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A query failed on an otherwise live connection.
    #[error("Query failed: {0}")]
    Query(String),

    /// A change-tracked table returned no timestamp.
    #[error("No change timestamp: {0} table is empty")]
    EmptyChangeSet(ChangeSet),

    // =========================================================================
    // Output Errors
    // =========================================================================
    /// PLU file could not be written or replaced.
    #[error("Failed to write {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Unexpected fault.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<plu_db::DbError> for SyncError {
    fn from(err: plu_db::DbError) -> Self {
        if err.is_connection_error() {
            SyncError::ConnectionFailed(err.to_string())
        } else {
            SyncError::Query(err.to_string())
        }
    }
}

impl From<ValidationError> for SyncError {
    fn from(err: ValidationError) -> Self {
        SyncError::Config(err.to_string())
    }
}

impl From<ChangeError> for SyncError {
    fn from(err: ChangeError) -> Self {
        match err {
            ChangeError::EmptyChangeSet(set) => SyncError::EmptyChangeSet(set),
        }
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::Config(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for the service loop)
// =============================================================================

impl SyncError {
    /// Returns true if the connection must be dropped and re-established.
    pub fn is_data_source_error(&self) -> bool {
        matches!(
            self,
            SyncError::ConnectionFailed(_) | SyncError::Query(_) | SyncError::EmptyChangeSet(_)
        )
    }

    /// Returns true if the loop should back off for the fault cooldown.
    pub fn is_fault(&self) -> bool {
        matches!(self, SyncError::Internal(_))
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(self, SyncError::Config(_))
    }
}
