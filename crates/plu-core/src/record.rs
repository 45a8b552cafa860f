//! # Output Record
//!
//! One line of the PLU file.
//!
//! ## Column Layout
//! ```text
//! ┌─────┬──────────────────┬────────────────────────────────────────────────┐
//! │  #  │ Column           │ Value                                          │
//! ├─────┼──────────────────┼────────────────────────────────────────────────┤
//! │  1  │ hotkey           │ description or 0                               │
//! │  2  │ name             │ product name                                   │
//! │  3  │ identifier (LF)  │ accepted articul or product code               │
//! │  4  │ code             │ product code                                   │
//! │  5  │ barcode_type     │ unit                                           │
//! │  6  │ unit_price       │ integer device price                           │
//! │  7  │ scale_unit_code  │ unit                                           │
//! │  8  │ department       │ unit prefix                                    │
//! │  9  │ pt_weight        │ 0                                              │
//! │ 10  │ shelf_time       │ constant (15)                                  │
//! │ 11  │ pack_type        │ 0                                              │
//! │ 12  │ tare             │ 0                                              │
//! │ 13  │ error_pct        │ 0                                              │
//! │ 14  │ message1         │ 0                                              │
//! │ 15  │ message2         │ 0                                              │
//! │ ‥   │ reserved         │ 0  (format B only)                             │
//! │ 16  │ label_id         │ unit                                           │
//! │ 17  │ discount_table   │ 0                                              │
//! │ 18  │ nutrition        │ 0                                              │
//! └─────┴──────────────────┴────────────────────────────────────────────────┘
//! ```
//!
//! The slot count and order never depend on options, only on the format.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::price::DevicePrice;

/// Number of columns in format A.
pub const FORMAT_A_FIELDS: usize = 18;

/// Number of columns in format B (reserved slot before `label_id`).
pub const FORMAT_B_FIELDS: usize = 19;

// =============================================================================
// Format Version
// =============================================================================

/// PLU file layout understood by the scale software.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatVersion {
    /// 18 columns.
    #[default]
    A,
    /// 19 columns, reserved `0` before `label_id`.
    B,
}

impl FormatVersion {
    /// Columns per line for this format.
    pub const fn field_count(&self) -> usize {
        match self {
            FormatVersion::A => FORMAT_A_FIELDS,
            FormatVersion::B => FORMAT_B_FIELDS,
        }
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatVersion::A => write!(f, "a"),
            FormatVersion::B => write!(f, "b"),
        }
    }
}

impl std::str::FromStr for FormatVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "a" => Ok(FormatVersion::A),
            "b" => Ok(FormatVersion::B),
            other => Err(format!("Unknown PLU format '{}'. Valid options: a, b", other)),
        }
    }
}

// =============================================================================
// Output Record
// =============================================================================

/// A device record with the variable columns filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRecord {
    pub format: FormatVersion,
    pub hotkey: String,
    pub name: String,
    pub identifier: String,
    pub code: String,
    pub barcode_type: u32,
    pub unit_price: DevicePrice,
    pub scale_unit_code: String,
    pub department_prefix: u32,
    pub shelf_time: u32,
    pub label_id: u32,
}

impl OutputRecord {
    /// Renders the record's columns in file order.
    pub fn fields(&self) -> Vec<String> {
        const ZERO: &str = "0";

        let mut fields = Vec::with_capacity(self.format.field_count());
        fields.push(self.hotkey.clone());
        fields.push(self.name.clone());
        fields.push(self.identifier.clone());
        fields.push(self.code.clone());
        fields.push(self.barcode_type.to_string());
        fields.push(self.unit_price.to_string());
        fields.push(self.scale_unit_code.clone());
        fields.push(self.department_prefix.to_string());
        fields.push(ZERO.to_string()); // pt weight
        fields.push(self.shelf_time.to_string());
        fields.push(ZERO.to_string()); // pack type
        fields.push(ZERO.to_string()); // tare
        fields.push(ZERO.to_string()); // error %
        fields.push(ZERO.to_string()); // message 1
        fields.push(ZERO.to_string()); // message 2
        if self.format == FormatVersion::B {
            fields.push(ZERO.to_string()); // reserved
        }
        fields.push(self.label_id.to_string());
        fields.push(ZERO.to_string()); // discount table
        fields.push(ZERO.to_string()); // nutrition

        debug_assert_eq!(fields.len(), self.format.field_count());
        fields
    }

    /// The record as one tab-separated line, without terminator.
    pub fn to_line(&self) -> String {
        self.fields().join("\t")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(format: FormatVersion) -> OutputRecord {
        OutputRecord {
            format,
            hotkey: "0".to_string(),
            name: "Apples".to_string(),
            identifier: "17".to_string(),
            code: "1017".to_string(),
            barcode_type: 7,
            unit_price: DevicePrice::new(1250),
            scale_unit_code: "4".to_string(),
            department_prefix: 22,
            shelf_time: 15,
            label_id: 3,
        }
    }

    #[test]
    fn test_format_a_layout() {
        let fields = record(FormatVersion::A).fields();
        assert_eq!(fields.len(), 18);
        assert_eq!(
            fields,
            vec![
                "0", "Apples", "17", "1017", "7", "1250", "4", "22", "0", "15", "0", "0", "0",
                "0", "0", "3", "0", "0"
            ]
        );
    }

    #[test]
    fn test_format_b_inserts_reserved_before_label() {
        let fields = record(FormatVersion::B).fields();
        assert_eq!(fields.len(), 19);
        assert_eq!(fields[15], "0");
        assert_eq!(fields[16], "3");
        assert_eq!(&fields[17..], &["0", "0"]);
    }

    #[test]
    fn test_to_line() {
        let line = record(FormatVersion::A).to_line();
        assert!(line.starts_with("0\tApples\t17\t1017\t"));
        assert_eq!(line.split('\t').count(), 18);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("A".parse::<FormatVersion>().unwrap(), FormatVersion::A);
        assert_eq!("b".parse::<FormatVersion>().unwrap(), FormatVersion::B);
        assert!("c".parse::<FormatVersion>().is_err());
    }
}
