//! # plu-db: Database Layer for PLU Sync
//!
//! Read-only access to the EasyTrade back office database. It uses MySQL
//! through sqlx and never changes the schema or the data.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         PLU Sync Data Flow                              │
//! │                                                                         │
//! │  Export cycle (plu-sync)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     plu-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────────────────────────┐   │   │
//! │  │   │   Database    │    │  Repositories                     │   │   │
//! │  │   │   (pool.rs)   │    │                                   │   │   │
//! │  │   │               │    │  GoodsRepository                  │   │   │
//! │  │   │ MySqlPool     │◄───│   latest_change / fetch_export    │   │   │
//! │  │   │ (1 conn)      │    │  PriceRepository                  │   │   │
//! │  │   │               │    │   latest_change                   │   │   │
//! │  │   └───────────────┘    └───────────────────────────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           MySQL: easytrade_db (dir_goods, dir_prices)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (goods, prices)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use plu_db::{Database, DbConfig};
//!
//! let config = DbConfig::new("localhost", "easytrade_db", "easytrade", "masterkey");
//! let db = Database::connect(config).await?;
//!
//! let goods = db.goods().latest_change().await?;
//! let prices = db.prices().latest_change().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::goods::GoodsRepository;
pub use repository::prices::PriceRepository;
