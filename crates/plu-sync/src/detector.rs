//! # Change Detector
//!
//! Reads both change timestamps from a [`DataSource`] and compares them with
//! the [`ChangeState`] of the last export.
//!
//! `detect` only observes. The exporter calls `commit` once the new state is
//! safely on disk, so a failed cycle is detected again on the next tick.

use chrono::NaiveDateTime;
use tracing::debug;

use plu_core::{ChangeState, Detection};

use crate::error::SyncResult;
use crate::source::DataSource;

/// Change detection over one data source.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    state: ChangeState,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queries both timestamps and reports whether a re-export is due.
    ///
    /// ## Errors
    /// - Query/connection errors from the source
    /// - `SyncError::EmptyChangeSet` when either table has no rows
    ///
    /// The stored state is never modified here.
    pub async fn detect(&self, source: &dyn DataSource) -> SyncResult<Detection> {
        let goods = source.latest_goods_change().await?;
        let prices = source.latest_price_change().await?;

        let detection = self.state.evaluate(goods, prices)?;

        debug!(
            goods = ?goods,
            prices = ?prices,
            last_seen = ?self.state.last_seen(),
            changed = detection.is_changed(),
            "Change detection"
        );

        Ok(detection)
    }

    /// Records `latest` as exported.
    pub fn commit(&mut self, latest: NaiveDateTime) {
        self.state.commit(latest);
    }

    pub fn state(&self) -> &ChangeState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::memory::{FailurePoint, MemorySource};
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_detection_is_changed() {
        let source = MemorySource::new();
        source.set_changes(Some(at(9)), Some(at(11))).await;

        let detector = ChangeDetector::new();
        let detection = detector.detect(&source).await.unwrap();
        assert_eq!(detection, Detection::Changed { latest: at(11) });
        assert!(detector.state().last_seen().is_none());
    }

    #[tokio::test]
    async fn test_commit_then_unchanged() {
        let source = MemorySource::new();
        source.set_changes(Some(at(9)), Some(at(8))).await;

        let mut detector = ChangeDetector::new();
        if let Detection::Changed { latest } = detector.detect(&source).await.unwrap() {
            detector.commit(latest);
        }
        assert_eq!(detector.detect(&source).await.unwrap(), Detection::Unchanged);

        // A newer price change is seen even though goods did not move.
        source.set_changes(Some(at(9)), Some(at(10))).await;
        assert!(detector.detect(&source).await.unwrap().is_changed());
    }

    #[tokio::test]
    async fn test_empty_table_is_error() {
        let source = MemorySource::new();
        source.set_changes(Some(at(9)), None).await;

        let detector = ChangeDetector::new();
        let err = detector.detect(&source).await.unwrap_err();
        assert!(matches!(err, SyncError::EmptyChangeSet(_)));
        assert!(err.is_data_source_error());
    }

    #[tokio::test]
    async fn test_query_failure_keeps_state() {
        let source = MemorySource::new();
        source.set_changes(Some(at(9)), Some(at(9))).await;

        let mut detector = ChangeDetector::new();
        detector.commit(at(8));

        source.set_failure(Some(FailurePoint::ChangeQuery)).await;
        assert!(detector.detect(&source).await.is_err());
        assert_eq!(detector.state().last_seen(), Some(at(8)));
    }
}
