//! # Price Repository
//!
//! Change timestamp of the price list table.

use chrono::NaiveDateTime;
use sqlx::MySqlPool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for the prices table.
#[derive(Debug, Clone)]
pub struct PriceRepository {
    pool: MySqlPool,
}

impl PriceRepository {
    /// Creates a new PriceRepository.
    pub fn new(pool: MySqlPool) -> Self {
        PriceRepository { pool }
    }

    /// Latest `prc_last_update` over all price types, `None` when the table
    /// is empty.
    pub async fn latest_change(&self) -> DbResult<Option<NaiveDateTime>> {
        let latest: Option<NaiveDateTime> =
            sqlx::query_scalar("SELECT MAX(prc_last_update) FROM dir_prices")
                .fetch_one(&self.pool)
                .await?;

        debug!(latest = ?latest, "Prices latest change");
        Ok(latest)
    }
}
