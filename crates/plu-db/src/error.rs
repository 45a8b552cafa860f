//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  MySQL Error (sqlx::Error)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds categorization                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncError (plu-sync) ← ConnectionFailed or Query                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Service loop drops the connection and reconnects next cycle           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// MySQL client error codes that mean the link itself is gone.
///
/// 2002 can't connect (socket), 2003 can't connect (TCP), 2006 server has
/// gone away, 2013 lost connection during query.
const CONNECTION_ERROR_CODES: &[&str] = &["2002", "2003", "2006", "2013"];

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Database connection failed or was lost.
    ///
    /// ## When This Occurs
    /// - MySQL server not reachable / not running
    /// - Wrong credentials or database name
    /// - Connection dropped between cycles
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed.
    ///
    /// ## When This Occurs
    /// - Missing table or column (schema differs from EasyTrade's)
    /// - `RESET QUERY CACHE` on a server without query cache
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A column could not be decoded into the expected Rust type.
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Pool exhausted (the single connection is busy or unreachable).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Returns true if the connection should be considered broken.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, DbError::ConnectionFailed(_) | DbError::PoolExhausted)
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Io / Tls        → DbError::ConnectionFailed
/// sqlx::Error::Database        → ConnectionFailed (2002/2003/2006/2013)
///                                 QueryFailed otherwise
/// sqlx::Error::PoolTimedOut    → DbError::PoolExhausted
/// sqlx::Error::ColumnDecode    → DbError::Decode
/// Other                        → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(io) => DbError::ConnectionFailed(io.to_string()),

            sqlx::Error::Tls(tls) => DbError::ConnectionFailed(tls.to_string()),

            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.into_owned());
                let msg = db_err.message().to_string();

                match code {
                    Some(code) if CONNECTION_ERROR_CODES.contains(&code.as_str()) => {
                        DbError::ConnectionFailed(msg)
                    }
                    _ => DbError::QueryFailed(msg),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            sqlx::Error::ColumnDecode { index, source } => {
                DbError::Decode(format!("column {}: {}", index, source))
            }

            sqlx::Error::ColumnNotFound(column) => {
                DbError::QueryFailed(format!("column not found: {}", column))
            }

            _ => DbError::Internal(err.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;
