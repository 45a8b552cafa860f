//! # Data Sources
//!
//! The seam between the export cycle and the back office database.
//!
//! ## Trait Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ConnectionProvider ──connect()──► DataSource                          │
//! │  ──────────────────                ──────────                          │
//! │  MySqlProvider                     MySqlSource   (plu-db Database)     │
//! │  MemoryProvider                    MemorySource  (tests, dry runs)     │
//! │                                                                         │
//! │  ExportService owns one provider and at most one live source.          │
//! │  A data-source error drops the source; the next tick connects anew.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::{debug, info};

use plu_core::{ProductRow, UnitFilter};
use plu_db::{Database, DbConfig};

use crate::error::SyncResult;

// =============================================================================
// Traits
// =============================================================================

/// Read access to goods and prices.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// `MAX(gd_last_update)`, `None` for an empty goods table.
    async fn latest_goods_change(&self) -> SyncResult<Option<NaiveDateTime>>;

    /// `MAX(prc_last_update)`, `None` for an empty prices table.
    async fn latest_price_change(&self) -> SyncResult<Option<NaiveDateTime>>;

    /// Every exportable product for `price_type` and `units`, ordered by code.
    async fn fetch_products(
        &self,
        price_type: i64,
        units: &UnitFilter,
    ) -> SyncResult<Vec<ProductRow>>;

    /// Releases the connection. Called before the source is dropped.
    async fn close(&self) {}
}

/// Opens data sources.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    type Source: DataSource;

    /// Opens a new connection.
    ///
    /// ## Errors
    /// `SyncError::ConnectionFailed` when the data source is unreachable.
    async fn connect(&self) -> SyncResult<Self::Source>;
}

// =============================================================================
// MySQL
// =============================================================================

/// Data source backed by the EasyTrade MySQL database.
#[derive(Debug, Clone)]
pub struct MySqlSource {
    db: Database,
    reset_query_cache: bool,
}

impl MySqlSource {
    pub fn new(db: Database, reset_query_cache: bool) -> Self {
        MySqlSource {
            db,
            reset_query_cache,
        }
    }

    async fn prepare(&self) -> SyncResult<()> {
        if self.reset_query_cache {
            self.db.reset_query_cache().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl DataSource for MySqlSource {
    async fn latest_goods_change(&self) -> SyncResult<Option<NaiveDateTime>> {
        self.prepare().await?;
        Ok(self.db.goods().latest_change().await?)
    }

    async fn latest_price_change(&self) -> SyncResult<Option<NaiveDateTime>> {
        Ok(self.db.prices().latest_change().await?)
    }

    async fn fetch_products(
        &self,
        price_type: i64,
        units: &UnitFilter,
    ) -> SyncResult<Vec<ProductRow>> {
        self.prepare().await?;
        Ok(self.db.goods().fetch_export(price_type, units).await?)
    }

    async fn close(&self) {
        self.db.close().await;
    }
}

/// Connects to MySQL with a fixed configuration.
#[derive(Debug, Clone)]
pub struct MySqlProvider {
    config: DbConfig,
    reset_query_cache: bool,
}

impl MySqlProvider {
    pub fn new(config: DbConfig, reset_query_cache: bool) -> Self {
        MySqlProvider {
            config,
            reset_query_cache,
        }
    }
}

#[async_trait]
impl ConnectionProvider for MySqlProvider {
    type Source = MySqlSource;

    async fn connect(&self) -> SyncResult<MySqlSource> {
        debug!(host = %self.config.host, "Opening MySQL data source");
        let db = Database::connect(self.config.clone()).await?;

        if !db.health_check().await {
            db.close().await;
            return Err(crate::error::SyncError::ConnectionFailed(
                "health check failed after connect".into(),
            ));
        }

        info!(database = %self.config.database, "MySQL data source ready");
        Ok(MySqlSource::new(db, self.reset_query_cache))
    }
}
