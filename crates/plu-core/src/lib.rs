//! # plu-core: Pure Business Logic for the PLU export
//!
//! Everything that decides *what* ends up in the scale's PLU file lives here,
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         PLU Sync Data Flow                              │
//! │                                                                         │
//! │  MySQL (plu-db)                                                        │
//! │     │  ProductRow                                                      │
//! │     ▼                                                                   │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               ★ plu-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  catalog  │  │ validation│  │   price   │  │ transform │  │   │
//! │  │   │UnitCatalog│  │  articul  │  │DevicePrice│  │ Record-   │  │   │
//! │  │   │UnitFilter │  │SeenCodeSet│  │ PriceMode │  │Transformer│  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐                                 │   │
//! │  │   │  change   │  │  record   │                                 │   │
//! │  │   │ChangeState│  │OutputRec. │                                 │   │
//! │  │   └───────────┘  └───────────┘                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │     │  OutputRecord                                                    │
//! │     ▼                                                                   │
//! │  PLU file writer (plu-sync)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (UnitConfig, ProductRow)
//! - [`catalog`] - Unit catalog and the unit filter used by the product query
//! - [`change`] - Change-state comparison for the detector
//! - [`price`] - Raw price → integer device price
//! - [`validation`] - Articul (unique code) validation
//! - [`record`] - Output record layout (format A / B)
//! - [`transform`] - Row → record transformation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use plu_core::price::PriceMode;
//! use rust_decimal::Decimal;
//!
//! let mode = PriceMode::Scaled { divider: 100 };
//! let price = mode.to_device_price(Decimal::new(125, 1)).unwrap(); // 12.5
//! assert_eq!(price.value(), 1250);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod change;
pub mod error;
pub mod price;
pub mod record;
pub mod transform;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use catalog::{UnitCatalog, UnitFilter};
pub use change::{ChangeError, ChangeSet, ChangeState, Detection};
pub use error::{TransformError, ValidationError};
pub use price::{DevicePrice, PriceMode};
pub use record::{FormatVersion, OutputRecord};
pub use transform::{RecordTransformer, TransformOptions};
pub use types::*;
pub use validation::{ArticulCheck, RejectReason, SeenCodeSet};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Smallest articul the scale accepts as a unique code.
pub const MIN_ARTICUL: u16 = 1;

/// Largest articul the scale accepts as a unique code.
pub const MAX_ARTICUL: u16 = 9999;

/// Shelf time written into every record unless configured otherwise.
pub const DEFAULT_SHELF_TIME: u32 = 15;
