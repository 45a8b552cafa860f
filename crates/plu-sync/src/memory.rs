//! # In-Memory Data Source
//!
//! A [`DataSource`] that holds goods and prices in memory and applies the
//! same filters as the MySQL export query. Used by the test suites and for
//! exercising the exporter without a database.
//!
//! Clones share state, so a test can keep one handle and mutate the data
//! while the service owns another.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use plu_core::{ProductRow, UnitFilter};

use crate::error::{SyncError, SyncResult};
use crate::source::{ConnectionProvider, DataSource};

/// A product with the columns the export query filters on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryProduct {
    pub row: ProductRow,
    /// `prc_type` of the attached price.
    pub price_type: i64,
    /// `gd_deleted_mark` or `gd_deleted` set.
    pub deleted: bool,
}

impl MemoryProduct {
    pub fn new(row: ProductRow, price_type: i64) -> Self {
        MemoryProduct {
            row,
            price_type,
            deleted: false,
        }
    }

    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    fn qualifies(&self, price_type: i64, units: &UnitFilter) -> bool {
        !self.deleted
            && self.price_type == price_type
            && self.row.price > Decimal::ZERO
            && units.matches(self.row.unit_id)
    }
}

/// Where an injected failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// The timestamp queries fail with a query error.
    ChangeQuery,
    /// The product fetch fails with a lost connection.
    Fetch,
    /// The product fetch panics.
    FetchPanic,
}

#[derive(Debug, Default)]
struct MemoryData {
    goods_change: Option<NaiveDateTime>,
    price_change: Option<NaiveDateTime>,
    products: Vec<MemoryProduct>,
    failure: Option<FailurePoint>,
}

/// In-memory goods and prices.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    data: Arc<RwLock<MemoryData>>,
    fetches: Arc<AtomicUsize>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets both change timestamps.
    pub async fn set_changes(
        &self,
        goods: Option<NaiveDateTime>,
        prices: Option<NaiveDateTime>,
    ) {
        let mut data = self.data.write().await;
        data.goods_change = goods;
        data.price_change = prices;
    }

    /// Adds a product.
    pub async fn insert(&self, product: MemoryProduct) {
        self.data.write().await.products.push(product);
    }

    /// Replaces all products.
    pub async fn set_products(&self, products: Vec<MemoryProduct>) {
        self.data.write().await.products = products;
    }

    /// Makes every later call at `point` fail until cleared with `None`.
    pub async fn set_failure(&self, point: Option<FailurePoint>) {
        self.data.write().await.failure = point;
    }

    /// Number of `fetch_products` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for MemorySource {
    async fn latest_goods_change(&self) -> SyncResult<Option<NaiveDateTime>> {
        let data = self.data.read().await;
        if data.failure == Some(FailurePoint::ChangeQuery) {
            return Err(SyncError::Query("injected change query failure".into()));
        }
        Ok(data.goods_change)
    }

    async fn latest_price_change(&self) -> SyncResult<Option<NaiveDateTime>> {
        let data = self.data.read().await;
        if data.failure == Some(FailurePoint::ChangeQuery) {
            return Err(SyncError::Query("injected change query failure".into()));
        }
        Ok(data.price_change)
    }

    async fn fetch_products(
        &self,
        price_type: i64,
        units: &UnitFilter,
    ) -> SyncResult<Vec<ProductRow>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let data = self.data.read().await;

        match data.failure {
            Some(FailurePoint::Fetch) => {
                return Err(SyncError::ConnectionFailed("injected fetch failure".into()))
            }
            Some(FailurePoint::FetchPanic) => panic!("injected fetch panic"),
            _ => {}
        }

        // Insertion order stands in for the server's row order; the exporter
        // must not depend on it.
        Ok(data
            .products
            .iter()
            .filter(|p| p.qualifies(price_type, units))
            .map(|p| p.row.clone())
            .collect())
    }
}

/// Hands out clones of one [`MemorySource`].
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    source: MemorySource,
    refuse: Arc<RwLock<bool>>,
    connects: Arc<AtomicUsize>,
}

impl MemoryProvider {
    pub fn new(source: MemorySource) -> Self {
        MemoryProvider {
            source,
            refuse: Arc::new(RwLock::new(false)),
            connects: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The shared source.
    pub fn source(&self) -> &MemorySource {
        &self.source
    }

    /// Refuses connections while `true`.
    pub async fn set_refuse(&self, refuse: bool) {
        *self.refuse.write().await = refuse;
    }

    /// Successful connects so far.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionProvider for MemoryProvider {
    type Source = MemorySource;

    async fn connect(&self) -> SyncResult<MemorySource> {
        if *self.refuse.read().await {
            return Err(SyncError::ConnectionFailed("connection refused".into()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.source.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, code: &str, unit_id: i64, price: i64) -> MemoryProduct {
        MemoryProduct::new(
            ProductRow::new(id, code, format!("Product {}", code), unit_id, Decimal::from(price)),
            1,
        )
    }

    #[tokio::test]
    async fn test_fetch_applies_filters() {
        let source = MemorySource::new();
        source
            .set_products(vec![
                product(1, "10", 2, 100),
                product(2, "11", 1, 0),
                product(3, "12", 3, 100),
                product(4, "13", 1, 50).deleted(),
                MemoryProduct::new(ProductRow::new(5, "14", "Other list", 1, Decimal::ONE), 2),
            ])
            .await;

        let units = UnitFilter::new([1, 2]).unwrap();
        let rows = source.fetch_products(1, &units).await.unwrap();

        let codes: Vec<_> = rows.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["10"]);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let source = MemorySource::new();
        source.set_failure(Some(FailurePoint::ChangeQuery)).await;
        assert!(source.latest_goods_change().await.is_err());

        source.set_failure(Some(FailurePoint::Fetch)).await;
        assert!(source.latest_goods_change().await.is_ok());
        let units = UnitFilter::new([1]).unwrap();
        assert!(source.fetch_products(1, &units).await.is_err());
    }

    #[tokio::test]
    async fn test_provider_refusal() {
        let provider = MemoryProvider::new(MemorySource::new());
        provider.set_refuse(true).await;
        assert!(provider.connect().await.is_err());

        provider.set_refuse(false).await;
        assert!(provider.connect().await.is_ok());
        assert_eq!(provider.connect_count(), 1);
    }
}
