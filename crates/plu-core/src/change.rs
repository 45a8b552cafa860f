//! # Change State
//!
//! Decides whether the back office changed since the last export.
//!
//! ## Detection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Change Detection                                  │
//! │                                                                         │
//! │  MAX(gd_last_update)  ──┐                                              │
//! │                         ├──► latest = max(goods, prices)               │
//! │  MAX(prc_last_update) ──┘          │                                   │
//! │                                    ▼                                    │
//! │                     latest > last_seen ?                               │
//! │                       │             │                                   │
//! │                      yes            no                                  │
//! │                       ▼             ▼                                   │
//! │           Changed { latest }     Unchanged                              │
//! │                       │                                                 │
//! │                       ▼                                                 │
//! │     commit(latest) once the export finished                            │
//! │                                                                         │
//! │  Either set empty (MAX = NULL) → ChangeError::EmptyChangeSet           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `evaluate` never mutates the state. The export cycle calls `commit` only
//! after the PLU file was written, so a failed fetch or write leaves the
//! baseline untouched and the next cycle sees the same change again.

use chrono::NaiveDateTime;
use thiserror::Error;

/// The change-tracked data sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSet {
    Goods,
    Prices,
}

impl std::fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeSet::Goods => write!(f, "goods"),
            ChangeSet::Prices => write!(f, "prices"),
        }
    }
}

/// Change detection failures that originate in the data itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChangeError {
    /// A change-tracked table has no rows, so there is nothing to compare.
    #[error("{0} table has no last-modified timestamp (empty result set)")]
    EmptyChangeSet(ChangeSet),
}

/// Outcome of comparing the data source against the known state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// Newer data exists; `latest` becomes the baseline once exported.
    Changed { latest: NaiveDateTime },
    /// Nothing newer than the last export.
    Unchanged,
}

impl Detection {
    pub fn is_changed(&self) -> bool {
        matches!(self, Detection::Changed { .. })
    }
}

/// Last-modified timestamp of the most recent exported state.
///
/// Starts at "never" (unix time 0) and lives only as long as the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeState {
    last_seen: Option<NaiveDateTime>,
}

impl ChangeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares the two latest timestamps against the stored baseline.
    ///
    /// ## Errors
    /// `ChangeError::EmptyChangeSet` when either timestamp is missing.
    pub fn evaluate(
        &self,
        goods: Option<NaiveDateTime>,
        prices: Option<NaiveDateTime>,
    ) -> Result<Detection, ChangeError> {
        let goods = goods.ok_or(ChangeError::EmptyChangeSet(ChangeSet::Goods))?;
        let prices = prices.ok_or(ChangeError::EmptyChangeSet(ChangeSet::Prices))?;

        let latest = goods.max(prices);

        match self.last_seen {
            Some(seen) if latest <= seen => Ok(Detection::Unchanged),
            _ => Ok(Detection::Changed { latest }),
        }
    }

    /// Advances the baseline. Older timestamps are ignored.
    pub fn commit(&mut self, latest: NaiveDateTime) {
        if self.last_seen.map_or(true, |seen| latest > seen) {
            self.last_seen = Some(latest);
        }
    }

    /// The stored baseline, `None` before the first export.
    pub fn last_seen(&self) -> Option<NaiveDateTime> {
        self.last_seen
    }

    /// The baseline as unix seconds, `0.0` before the first export.
    pub fn last_seen_timestamp(&self) -> f64 {
        self.last_seen
            .map(|seen| seen.and_utc().timestamp_millis() as f64 / 1000.0)
            .unwrap_or(0.0)
    }
}
