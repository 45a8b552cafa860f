//! # Database Pool Management
//!
//! Connection pool creation and configuration for MySQL.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Service (Disconnected)                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(host, db, user, pass) ← Configure pool settings         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::connect(config).await ← Create pool + first connection      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            MySqlPool                     │                           │
//! │  │  ┌─────┐                                 │                           │
//! │  │  │Conn1│   (max_connections = 1)         │                           │
//! │  │  └─────┘                                 │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       │ One export cycle at a time                                     │
//! │       ▼                                                                 │
//! │  MAX(goods) ─► MAX(prices) ─► SELECT export rows                       │
//! │                                                                         │
//! │  On a connection error the service drops the Database and calls       │
//! │  connect() again on the next cycle.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::MySqlPool;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::goods::GoodsRepository;
use crate::repository::prices::PriceRepository;

/// Default MySQL port.
pub const DEFAULT_PORT: u16 = 3306;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("localhost", "easytrade_db", "easytrade", "masterkey")
///     .port(3307)
///     .connect_timeout(Duration::from_secs(5));
/// ```
#[derive(Clone)]
pub struct DbConfig {
    /// Server host name or address.
    pub host: String,

    /// Server port.
    /// Default: 3306
    pub port: u16,

    /// Database (schema) name.
    pub database: String,

    /// Login user.
    pub user: String,

    /// Login password.
    pub password: String,

    /// Connection timeout duration.
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// Maximum number of connections in the pool.
    /// Default: 1 (export cycles never overlap)
    pub max_connections: u32,
}

impl DbConfig {
    /// Creates a new database configuration.
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        DbConfig {
            host: host.into(),
            port: DEFAULT_PORT,
            database: database.into(),
            user: user.into(),
            password: password.into(),
            connect_timeout: Duration::from_secs(10),
            max_connections: 1,
        }
    }

    /// Sets the server port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .charset("utf8mb4")
    }
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("connect_timeout", &self.connect_timeout)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// All access is read-only. The only statement besides SELECT is the
/// optional `RESET QUERY CACHE`.
#[derive(Debug, Clone)]
pub struct Database {
    /// The MySQL connection pool.
    pool: MySqlPool,
}

impl Database {
    /// Opens the pool and establishes the first connection.
    ///
    /// ## Returns
    /// * `Ok(Database)` - Server reachable and credentials accepted
    /// * `Err(DbError::ConnectionFailed)` - Anything else
    pub async fn connect(config: DbConfig) -> DbResult<Self> {
        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            user = %config.user,
            "Connecting to database"
        );

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(0)
            .acquire_timeout(config.connect_timeout)
            // Detects a dropped server before the export query runs.
            .test_before_acquire(true)
            .connect_with(config.connect_options())
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::QueryFailed(msg) | DbError::Internal(msg) | DbError::Decode(msg) => {
                    DbError::ConnectionFailed(msg)
                }
                other => other,
            })?;

        info!(max_connections = config.max_connections, "Database connected");

        Ok(Database { pool })
    }

    /// Returns the goods repository.
    pub fn goods(&self) -> GoodsRepository {
        GoodsRepository::new(self.pool.clone())
    }

    /// Returns the price repository.
    pub fn prices(&self) -> PriceRepository {
        PriceRepository::new(self.pool.clone())
    }

    /// Clears the server query cache.
    ///
    /// ## When To Call
    /// Before reading change timestamps, on servers where the query cache
    /// would otherwise return a stale `MAX()`.
    pub async fn reset_query_cache(&self) -> DbResult<()> {
        debug!("Resetting query cache");
        sqlx::query("RESET QUERY CACHE").execute(&self.pool).await?;
        Ok(())
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
