//! # Validation Module
//!
//! Articul (unique device code) validation.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Articul Validation                                 │
//! │                                                                         │
//! │  raw articul ──► trim                                                  │
//! │       │                                                                 │
//! │       ├── empty?                    → Rejected(Empty)                  │
//! │       ├── non-digit character?      → Rejected(NotNumeric)             │
//! │       ├── leading zero ("0042")?    → Rejected(LeadingZero)            │
//! │       ├── outside 1..=9999?         → Rejected(OutOfRange)   ("0" too) │
//! │       ├── already used this cycle?  → Rejected(Duplicate)              │
//! │       │                                                                 │
//! │       └── Accepted(value) and value registered in SeenCodeSet          │
//! │                                                                         │
//! │  Rejected rows fall back to their product code as identifier.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use plu_core::validation::{ArticulCheck, SeenCodeSet};
//!
//! let mut seen = SeenCodeSet::new();
//! assert_eq!(seen.claim("42"), ArticulCheck::Accepted(42));
//! assert!(!seen.claim("42").is_accepted()); // second use collides
//! ```

use std::collections::HashSet;
use std::fmt;

use crate::{MAX_ARTICUL, MIN_ARTICUL};

// =============================================================================
// Check Result
// =============================================================================

/// Why an articul cannot be used as the device identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    NotNumeric,
    LeadingZero,
    OutOfRange,
    Duplicate,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Empty => write!(f, "empty"),
            RejectReason::NotNumeric => write!(f, "not numeric"),
            RejectReason::LeadingZero => write!(f, "leading zero"),
            RejectReason::OutOfRange => {
                write!(f, "outside {}..={}", MIN_ARTICUL, MAX_ARTICUL)
            }
            RejectReason::Duplicate => write!(f, "already used in this export"),
        }
    }
}

/// Explicit outcome of an articul check.
///
/// `Accepted(0)` cannot happen; zero is out of range and comes back as
/// `Rejected(OutOfRange)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticulCheck {
    Accepted(u16),
    Rejected(RejectReason),
}

impl ArticulCheck {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ArticulCheck::Accepted(_))
    }
}

// =============================================================================
// Format Validation
// =============================================================================

/// Validates the format and range of a raw articul, ignoring uniqueness.
///
/// ## Example
/// ```rust
/// use plu_core::validation::{validate_articul, ArticulCheck, RejectReason};
///
/// assert_eq!(validate_articul("9999"), ArticulCheck::Accepted(9999));
/// assert_eq!(validate_articul("0042"), ArticulCheck::Rejected(RejectReason::LeadingZero));
/// assert_eq!(validate_articul("0"), ArticulCheck::Rejected(RejectReason::OutOfRange));
/// ```
pub fn validate_articul(raw: &str) -> ArticulCheck {
    let raw = raw.trim();

    if raw.is_empty() {
        return ArticulCheck::Rejected(RejectReason::Empty);
    }

    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return ArticulCheck::Rejected(RejectReason::NotNumeric);
    }

    if raw.len() > 1 && raw.starts_with('0') {
        return ArticulCheck::Rejected(RejectReason::LeadingZero);
    }

    // Digits only and no leading zero: anything longer than 4 digits is > 9999.
    match raw.parse::<u16>() {
        Ok(value) if (MIN_ARTICUL..=MAX_ARTICUL).contains(&value) => {
            ArticulCheck::Accepted(value)
        }
        _ => ArticulCheck::Rejected(RejectReason::OutOfRange),
    }
}

// =============================================================================
// Seen Code Set
// =============================================================================

/// Articuls already handed out in the current export cycle.
///
/// Created empty at the start of every cycle.
#[derive(Debug, Clone, Default)]
pub struct SeenCodeSet {
    codes: HashSet<u16>,
}

impl SeenCodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `raw` and, if it is free, registers it.
    ///
    /// A rejected articul leaves the set unchanged.
    pub fn claim(&mut self, raw: &str) -> ArticulCheck {
        match validate_articul(raw) {
            ArticulCheck::Accepted(value) => {
                if self.codes.insert(value) {
                    ArticulCheck::Accepted(value)
                } else {
                    ArticulCheck::Rejected(RejectReason::Duplicate)
                }
            }
            rejected => rejected,
        }
    }

    pub fn contains(&self, value: u16) -> bool {
        self.codes.contains(&value)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_articul_boundaries() {
        assert_eq!(validate_articul("1"), ArticulCheck::Accepted(1));
        assert_eq!(validate_articul("9999"), ArticulCheck::Accepted(9999));
        assert_eq!(
            validate_articul("0"),
            ArticulCheck::Rejected(RejectReason::OutOfRange)
        );
        assert_eq!(
            validate_articul("10000"),
            ArticulCheck::Rejected(RejectReason::OutOfRange)
        );
        assert_eq!(
            validate_articul("99999999999999999999"),
            ArticulCheck::Rejected(RejectReason::OutOfRange)
        );
    }

    #[test]
    fn test_validate_articul_format() {
        assert_eq!(
            validate_articul("0042"),
            ArticulCheck::Rejected(RejectReason::LeadingZero)
        );
        assert_eq!(
            validate_articul(""),
            ArticulCheck::Rejected(RejectReason::Empty)
        );
        assert_eq!(
            validate_articul("   "),
            ArticulCheck::Rejected(RejectReason::Empty)
        );
        assert_eq!(
            validate_articul("12a"),
            ArticulCheck::Rejected(RejectReason::NotNumeric)
        );
        assert_eq!(
            validate_articul("-5"),
            ArticulCheck::Rejected(RejectReason::NotNumeric)
        );
        assert_eq!(
            validate_articul("4.2"),
            ArticulCheck::Rejected(RejectReason::NotNumeric)
        );
        assert_eq!(validate_articul(" 42 "), ArticulCheck::Accepted(42));
    }

    #[test]
    fn test_claim_registers_once() {
        let mut seen = SeenCodeSet::new();
        assert_eq!(seen.claim("42"), ArticulCheck::Accepted(42));
        assert!(seen.contains(42));
        assert_eq!(
            seen.claim("42"),
            ArticulCheck::Rejected(RejectReason::Duplicate)
        );
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_rejected_claim_does_not_register() {
        let mut seen = SeenCodeSet::new();
        assert!(!seen.claim("0042").is_accepted());
        assert!(!seen.claim("0").is_accepted());
        assert!(seen.is_empty());

        // "0042" was not registered, so 42 is still free.
        assert_eq!(seen.claim("42"), ArticulCheck::Accepted(42));
    }
}
