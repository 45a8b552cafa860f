//! # Error Types
//!
//! Domain-specific error types for plu-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  plu-core errors                                                       │
//! │  ├── ValidationError  - Configuration / input validation failures      │
//! │  ├── ChangeError      - Change detection has nothing to compare        │
//! │  └── TransformError   - A single row cannot become a record            │
//! │                                                                         │
//! │  plu-db errors (separate crate)                                        │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  plu-sync errors                                                       │
//! │  └── SyncError        - What the service loop acts on                  │
//! │                                                                         │
//! │  Flow: ValidationError → SyncError::Config → log file                  │
//! │        TransformError  → row skipped, cycle continues                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Validation errors for configuration-derived values.
///
/// These are raised before any query runs, e.g. an empty unit set or two
/// units claiming the same EasyTrade id.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value.
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Transform Error
// =============================================================================

/// A product row that cannot be turned into a device record.
///
/// ## Handling
/// The export cycle logs the error, records the row as skipped and keeps
/// going with the remaining rows. Never fatal to the cycle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransformError {
    /// The row's unit has no entry in the unit catalog.
    ///
    /// ## When This Occurs
    /// - A product uses a unit that is not configured in `[[units]]`
    /// - The data source returned a unit outside the query's unit filter
    #[error("product {code}: unit {unit_id} is not configured")]
    UnknownUnit { code: String, unit_id: i64 },

    /// The converted price does not fit the device's integer field.
    #[error("product {code}: price {price} cannot be represented on the device")]
    PriceOutOfRange { code: String, price: Decimal },
}

impl TransformError {
    /// Product code of the rejected row.
    pub fn code(&self) -> &str {
        match self {
            TransformError::UnknownUnit { code, .. } => code,
            TransformError::PriceOutOfRange { code, .. } => code,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
