//! # Unit Catalog
//!
//! Maps EasyTrade unit ids to the scale's encoding parameters, and derives
//! the unit filter the product query uses.
//!
//! ```text
//! [[units]] (config) ──► UnitCatalog::new ──┬──► lookup(unit_id)   (transformer)
//!                                           └──► filter()          (fetcher)
//!                                                  │
//!                                                  ├── 1 id  → gd_unit = ?
//!                                                  └── n ids → gd_unit IN (?, ?, …)
//! ```

use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::types::UnitConfig;

// =============================================================================
// Unit Catalog
// =============================================================================

/// Immutable lookup table of configured units, keyed by EasyTrade unit id.
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    units: BTreeMap<i64, UnitConfig>,
}

impl UnitCatalog {
    /// Builds the catalog.
    ///
    /// ## Errors
    /// `ValidationError::Duplicate` if two units share a `domain_unit_id`.
    /// An empty list is accepted here; it is rejected by [`UnitCatalog::filter`]
    /// before a query is built.
    pub fn new(units: impl IntoIterator<Item = UnitConfig>) -> Result<Self, ValidationError> {
        let mut map = BTreeMap::new();
        for unit in units {
            let id = unit.domain_unit_id;
            if map.insert(id, unit).is_some() {
                return Err(ValidationError::Duplicate {
                    field: "domain_unit_id".to_string(),
                    value: id.to_string(),
                });
            }
        }
        Ok(UnitCatalog { units: map })
    }

    /// Looks up a unit by its EasyTrade id.
    #[inline]
    pub fn lookup(&self, unit_id: i64) -> Option<&UnitConfig> {
        self.units.get(&unit_id)
    }

    /// Configured unit ids in ascending order.
    pub fn unit_ids(&self) -> Vec<i64> {
        self.units.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Builds the query's unit filter from the configured units.
    pub fn filter(&self) -> Result<UnitFilter, ValidationError> {
        UnitFilter::new(self.unit_ids())
    }
}

// =============================================================================
// Unit Filter
// =============================================================================

/// The `gd_unit` restriction of the product query.
///
/// There is no "empty" variant: a filter that matches nothing is a
/// configuration mistake and cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitFilter {
    /// Exactly one unit: `gd_unit = ?`.
    Single(i64),
    /// Several units: `gd_unit IN (...)`. Always holds at least two ids.
    Any(Vec<i64>),
}

impl UnitFilter {
    /// Creates a filter from a set of unit ids (duplicates are collapsed).
    ///
    /// ## Errors
    /// `ValidationError::Required` when `ids` is empty.
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Result<Self, ValidationError> {
        let mut ids: Vec<i64> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        match ids.len() {
            0 => Err(ValidationError::Required {
                field: "units".to_string(),
            }),
            1 => Ok(UnitFilter::Single(ids[0])),
            _ => Ok(UnitFilter::Any(ids)),
        }
    }

    /// Unit ids covered by the filter.
    pub fn ids(&self) -> &[i64] {
        match self {
            UnitFilter::Single(id) => std::slice::from_ref(id),
            UnitFilter::Any(ids) => ids,
        }
    }

    /// Returns true if `unit_id` passes the filter.
    pub fn matches(&self, unit_id: i64) -> bool {
        self.ids().contains(&unit_id)
    }
}
