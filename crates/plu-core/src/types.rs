//! # Domain Types
//!
//! Core domain types shared by every crate of the workspace.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐          ┌─────────────────────┐              │
//! │  │    UnitConfig       │          │    ProductRow       │              │
//! │  │  ─────────────────  │          │  ─────────────────  │              │
//! │  │  domain_unit_id ◄───┼──────────┼─ unit_id            │              │
//! │  │  scale_unit_code    │          │  code, name         │              │
//! │  │  barcode_type       │          │  price (decimal)    │              │
//! │  │  department_prefix  │          │  articul?           │              │
//! │  │  label_id           │          │  description?       │              │
//! │  └─────────────────────┘          └─────────────────────┘              │
//! │   loaded once at startup           produced per export cycle           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Unit Configuration
// =============================================================================

/// Device encoding parameters for one EasyTrade unit type.
///
/// The EasyTrade unit id (`gd_unit`) is the key; everything else is what the
/// scale needs to print a label for goods sold in that unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitConfig {
    /// Human-readable name ("Весовой", "Штучный"). Informational only.
    #[serde(default)]
    pub name: String,

    /// Unit id as stored in `dir_goods.gd_unit`.
    pub domain_unit_id: i64,

    /// Scale unit code written into the "unit weight" column.
    #[serde(deserialize_with = "string_or_number")]
    pub scale_unit_code: String,

    /// Barcode type the scale prints for this unit.
    pub barcode_type: u32,

    /// Department prefix of the printed barcode (22 = weighted, 23 = piece).
    pub department_prefix: u32,

    /// Label layout id.
    pub label_id: u32,
}

/// Accepts `scale_unit_code = 4` as well as `scale_unit_code = "4"`.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

// =============================================================================
// Product Row
// =============================================================================

/// One qualifying product as read from goods ⨝ prices.
///
/// Transient: produced by the fetcher for one cycle and consumed by the
/// transformer right away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRow {
    /// `gd_id`.
    pub id: i64,

    /// Product code (`gd_code`), the scale's PLU number.
    pub code: String,

    /// Display name printed on the label.
    pub name: String,

    /// EasyTrade unit id (`gd_unit`).
    pub unit_id: i64,

    /// Price in the back office's currency units, exactly as stored.
    pub price: Decimal,

    /// Optional article number, candidate for the unique device code.
    pub articul: Option<String>,

    /// Optional free-text description, candidate for the hotkey column.
    pub description: Option<String>,
}

impl ProductRow {
    /// Convenience constructor used by data sources and tests.
    pub fn new(
        id: i64,
        code: impl Into<String>,
        name: impl Into<String>,
        unit_id: i64,
        price: Decimal,
    ) -> Self {
        ProductRow {
            id,
            code: code.into(),
            name: name.into(),
            unit_id,
            price,
            articul: None,
            description: None,
        }
    }

    /// Sets the articul.
    pub fn with_articul(mut self, articul: impl Into<String>) -> Self {
        self.articul = Some(articul.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Orders product codes the way the scale lists them.
///
/// Purely numeric codes compare by value (`"9"` before `"10"`), anything else
/// falls back to plain string order; numeric codes sort before non-numeric
/// ones.
pub fn compare_codes(a: &str, b: &str) -> std::cmp::Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
