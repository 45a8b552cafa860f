//! # Goods Repository
//!
//! Reads from `dir_goods`, alone or joined with `dir_prices`.
//!
//! ## Export Query
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SELECT id, code, name, unit, price, articul, description               │
//! │  FROM dir_goods G                                                       │
//! │  INNER JOIN dir_prices P ON G.gd_id = P.prc_good AND P.prc_type = ?     │
//! │  WHERE G.gd_deleted_mark = 0                                            │
//! │    AND G.gd_deleted = 0                                                 │
//! │    AND P.prc_value > 0                                                  │
//! │    AND G.gd_unit = ?            ← one configured unit                   │
//! │     or G.gd_unit IN (?, ?, …)   ← several configured units              │
//! │  ORDER BY G.gd_code                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every column is cast to a fixed SQL type so the row decodes the same way
//! whatever the column types are in a given EasyTrade install.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder};
use tracing::debug;

use crate::error::DbResult;
use plu_core::{ProductRow, UnitFilter};

/// Row shape of the export query.
#[derive(Debug, FromRow)]
struct ExportRow {
    id: i64,
    code: String,
    name: String,
    unit_id: i64,
    price: Decimal,
    articul: Option<String>,
    description: Option<String>,
}

impl From<ExportRow> for ProductRow {
    fn from(row: ExportRow) -> Self {
        ProductRow {
            id: row.id,
            code: row.code,
            name: row.name,
            unit_id: row.unit_id,
            price: row.price,
            articul: row.articul,
            description: row.description,
        }
    }
}

/// Repository for the goods table.
#[derive(Debug, Clone)]
pub struct GoodsRepository {
    pool: MySqlPool,
}

impl GoodsRepository {
    /// Creates a new GoodsRepository.
    pub fn new(pool: MySqlPool) -> Self {
        GoodsRepository { pool }
    }

    /// Latest `gd_last_update`, `None` when the table is empty.
    pub async fn latest_change(&self) -> DbResult<Option<NaiveDateTime>> {
        let latest: Option<NaiveDateTime> =
            sqlx::query_scalar("SELECT MAX(gd_last_update) FROM dir_goods")
                .fetch_one(&self.pool)
                .await?;

        debug!(latest = ?latest, "Goods latest change");
        Ok(latest)
    }

    /// Fetches every product that belongs in the PLU file.
    ///
    /// ## Arguments
    /// * `price_type` - Price list to export (`prc_type`)
    /// * `units` - Unit ids present in the unit catalog
    ///
    /// ## Returns
    /// Rows ordered by `gd_code`; an empty vector when nothing qualifies.
    pub async fn fetch_export(
        &self,
        price_type: i64,
        units: &UnitFilter,
    ) -> DbResult<Vec<ProductRow>> {
        let mut query = export_query(price_type, units);

        let rows: Vec<ExportRow> = query.build_query_as().fetch_all(&self.pool).await?;

        debug!(count = rows.len(), price_type, "Export query returned rows");
        Ok(rows.into_iter().map(ProductRow::from).collect())
    }
}

/// Builds the export query with bound parameters.
fn export_query(price_type: i64, units: &UnitFilter) -> QueryBuilder<'static, MySql> {
    let mut query = QueryBuilder::new(
        "SELECT \
            CAST(G.gd_id AS SIGNED) AS id, \
            CAST(G.gd_code AS CHAR) AS code, \
            CAST(COALESCE(G.gd_name, '') AS CHAR) AS name, \
            CAST(G.gd_unit AS SIGNED) AS unit_id, \
            CAST(P.prc_value AS DECIMAL(20, 4)) AS price, \
            CAST(G.gd_articul AS CHAR) AS articul, \
            CAST(G.gd_description AS CHAR) AS description \
        FROM dir_goods G \
        INNER JOIN dir_prices P ON G.gd_id = P.prc_good AND P.prc_type = ",
    );
    query.push_bind(price_type);
    query.push(
        " WHERE G.gd_deleted_mark = 0 \
          AND G.gd_deleted = 0 \
          AND P.prc_value > 0",
    );

    match units {
        UnitFilter::Single(id) => {
            query.push(" AND G.gd_unit = ");
            query.push_bind(*id);
        }
        UnitFilter::Any(ids) => {
            query.push(" AND G.gd_unit IN (");
            let mut separated = query.separated(", ");
            for id in ids {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");
        }
    }

    query.push(" ORDER BY G.gd_code");
    query
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_query_single_unit() {
        let filter = UnitFilter::new([2]).unwrap();
        let query = export_query(1, &filter);
        let sql = query.sql();

        assert!(sql.contains("P.prc_type = ?"));
        assert!(sql.contains("G.gd_unit = ?"));
        assert!(!sql.contains(" IN ("));
        assert!(sql.contains("G.gd_deleted_mark = 0"));
        assert!(sql.contains("G.gd_deleted = 0"));
        assert!(sql.contains("P.prc_value > 0"));
        assert!(sql.ends_with("ORDER BY G.gd_code"));
    }

    #[test]
    fn test_export_query_unit_set() {
        let filter = UnitFilter::new([2, 1, 5]).unwrap();
        let query = export_query(3, &filter);
        let sql = query.sql();

        assert!(sql.contains("G.gd_unit IN (?, ?, ?)"));
        assert_eq!(sql.matches('?').count(), 4);
    }

    #[test]
    fn test_export_row_conversion() {
        let row = ExportRow {
            id: 7,
            code: "1007".to_string(),
            name: "Pears".to_string(),
            unit_id: 2,
            price: Decimal::new(9950, 2),
            articul: Some("12".to_string()),
            description: None,
        };

        let product = ProductRow::from(row);
        assert_eq!(product.code, "1007");
        assert_eq!(product.price, Decimal::new(9950, 2));
        assert_eq!(product.articul.as_deref(), Some("12"));
        assert!(product.description.is_none());
    }
}
