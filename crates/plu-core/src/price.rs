//! # Price Module
//!
//! Converts back office prices into the integer the scale expects.
//!
//! ## Why Decimal In, Integer Out?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  As binary floats:                                                      │
//! │    0.29 × 100 = 28.999999999999996  → truncates to 28  ❌ WRONG!        │
//! │                                                                         │
//! │  OUR SOLUTION: exact decimals until the very last step                  │
//! │    0.29 × 100 = 29.00               → truncates to 29  ✅               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modes
//! - `Direct`: the stored value already is the device price, fractions are
//!   truncated (`12.5` → `12`).
//! - `Scaled { divider }`: the back office stores major units while the scale
//!   wants minor units (`12.5` × 100 → `1250`).
//!
//! Exactly one mode is active per deployment.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Device Price
// =============================================================================

/// Unit price as written into the PLU file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DevicePrice(i64);

impl DevicePrice {
    #[inline]
    pub const fn new(value: i64) -> Self {
        DevicePrice(value)
    }

    #[inline]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for DevicePrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Price Mode
// =============================================================================

/// How raw prices map to device prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceMode {
    /// Use the stored value, truncated to an integer.
    #[default]
    Direct,
    /// Multiply by `divider`, then truncate.
    Scaled { divider: u32 },
}

impl PriceMode {
    /// Builds the mode from the `[export.price_scaling]` settings.
    pub fn from_scaling(enabled: bool, divider: u32) -> Self {
        if enabled {
            PriceMode::Scaled { divider }
        } else {
            PriceMode::Direct
        }
    }

    /// Converts a raw price.
    ///
    /// ## Returns
    /// * `Some(DevicePrice)` - converted, truncated toward zero
    /// * `None` - the result does not fit an `i64`
    ///
    /// ## Example
    /// ```rust
    /// use plu_core::price::PriceMode;
    /// use rust_decimal::Decimal;
    ///
    /// let raw = Decimal::new(125, 1); // 12.5
    /// assert_eq!(PriceMode::Direct.to_device_price(raw).unwrap().value(), 12);
    /// assert_eq!(
    ///     PriceMode::Scaled { divider: 100 }.to_device_price(raw).unwrap().value(),
    ///     1250
    /// );
    /// ```
    pub fn to_device_price(&self, raw: Decimal) -> Option<DevicePrice> {
        let scaled = match self {
            PriceMode::Direct => raw,
            PriceMode::Scaled { divider } => raw.checked_mul(Decimal::from(*divider))?,
        };

        scaled.trunc().to_i64().map(DevicePrice)
    }
}

impl fmt::Display for PriceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceMode::Direct => write!(f, "direct"),
            PriceMode::Scaled { divider } => write!(f, "scaled x{}", divider),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
