//! # Record Transformer
//!
//! Turns one [`ProductRow`] into one [`OutputRecord`].
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Row → Record                                         │
//! │                                                                         │
//! │  ProductRow                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  catalog.lookup(unit_id) ── missing ──► TransformError::UnknownUnit    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PriceMode::to_device_price ── overflow ──► PriceOutOfRange            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  use_unique_code?  seen.claim(articul)                                 │
//! │       ├── Accepted(n) → identifier = n                                 │
//! │       └── otherwise   → identifier = code                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  use_description_as_hotkey?  description or "0"                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  OutputRecord { format A | B }                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::catalog::UnitCatalog;
use crate::error::TransformError;
use crate::price::PriceMode;
use crate::record::{FormatVersion, OutputRecord};
use crate::types::ProductRow;
use crate::validation::{ArticulCheck, SeenCodeSet};
use crate::DEFAULT_SHELF_TIME;

/// Hotkey column value when no description is used.
pub const NEUTRAL_HOTKEY: &str = "0";

// =============================================================================
// Options
// =============================================================================

/// Deployment-wide switches for the transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    pub price_mode: PriceMode,
    pub use_unique_code: bool,
    pub use_description_as_hotkey: bool,
    pub format: FormatVersion,
    pub shelf_time: u32,
}

impl Default for TransformOptions {
    fn default() -> Self {
        TransformOptions {
            price_mode: PriceMode::Direct,
            use_unique_code: false,
            use_description_as_hotkey: false,
            format: FormatVersion::A,
            shelf_time: DEFAULT_SHELF_TIME,
        }
    }
}

// =============================================================================
// Transformer
// =============================================================================

/// Holds the unit catalog and options for a whole deployment.
#[derive(Debug, Clone)]
pub struct RecordTransformer {
    catalog: UnitCatalog,
    options: TransformOptions,
}

impl RecordTransformer {
    pub fn new(catalog: UnitCatalog, options: TransformOptions) -> Self {
        RecordTransformer { catalog, options }
    }

    pub fn catalog(&self) -> &UnitCatalog {
        &self.catalog
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Transforms one row; `seen` must be fresh for every export cycle.
    pub fn transform(
        &self,
        row: &ProductRow,
        seen: &mut SeenCodeSet,
    ) -> Result<OutputRecord, TransformError> {
        transform(row, &self.catalog, seen, &self.options)
    }
}

/// Transforms one row into a device record.
///
/// ## Errors
/// - `UnknownUnit` - the row's unit is not in the catalog
/// - `PriceOutOfRange` - the converted price does not fit the device
///
/// Both errors leave `seen` untouched.
pub fn transform(
    row: &ProductRow,
    catalog: &UnitCatalog,
    seen: &mut SeenCodeSet,
    options: &TransformOptions,
) -> Result<OutputRecord, TransformError> {
    let unit = catalog
        .lookup(row.unit_id)
        .ok_or_else(|| TransformError::UnknownUnit {
            code: row.code.clone(),
            unit_id: row.unit_id,
        })?;

    let unit_price = options
        .price_mode
        .to_device_price(row.price)
        .ok_or_else(|| TransformError::PriceOutOfRange {
            code: row.code.clone(),
            price: row.price,
        })?;

    let code = sanitize(&row.code);

    let identifier = if options.use_unique_code {
        match row.articul.as_deref().map(|raw| seen.claim(raw)) {
            Some(ArticulCheck::Accepted(value)) => value.to_string(),
            _ => code.clone(),
        }
    } else {
        code.clone()
    };

    let hotkey = if options.use_description_as_hotkey {
        row.description
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(sanitize)
            .unwrap_or_else(|| NEUTRAL_HOTKEY.to_string())
    } else {
        NEUTRAL_HOTKEY.to_string()
    };

    Ok(OutputRecord {
        format: options.format,
        hotkey,
        name: sanitize(&row.name),
        identifier,
        code,
        barcode_type: unit.barcode_type,
        unit_price,
        scale_unit_code: unit.scale_unit_code.clone(),
        department_prefix: unit.department_prefix,
        shelf_time: options.shelf_time,
        label_id: unit.label_id,
    })
}

/// Tabs and line breaks would shift columns or split the record.
fn sanitize(text: &str) -> String {
    text.replace(['\t', '\r', '\n'], " ")
}

// =============================================================================
// Unit Tests
// =============================================================================
