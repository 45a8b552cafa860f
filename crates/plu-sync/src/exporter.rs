//! # Export Cycle
//!
//! One pass of detect → fetch → transform → write.
//!
//! ## Cycle Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          run_cycle()                                    │
//! │                                                                         │
//! │  catalog.filter() ── no units ──► SyncError::Config                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  detector.detect() ── Unchanged ──► CycleOutcome::Unchanged            │
//! │       │ Changed { latest }                                              │
//! │       ▼                                                                 │
//! │  source.fetch_products() ── [] ──► commit(latest), NoProducts          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  sort by code (numeric-aware), fresh SeenCodeSet                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  transform each row ── TransformError ──► skipped (logged, reported)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  writer.write() ── error ──► SyncError::Write (state not advanced)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  commit(latest), Exported                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

use plu_core::{compare_codes, Detection, RecordTransformer, SeenCodeSet, TransformError};

use crate::config::ExporterConfig;
use crate::detector::ChangeDetector;
use crate::error::SyncResult;
use crate::source::DataSource;
use crate::writer::{PluFileWriter, WriteStats};

// =============================================================================
// Cycle Report
// =============================================================================

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Nothing newer than the last export; no query beyond the timestamps.
    Unchanged,
    /// Data changed but no product qualifies (or every row was skipped);
    /// the existing file was left alone.
    NoProducts,
    /// A new PLU file was written.
    Exported,
}

/// A row left out of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub code: String,
    pub reason: String,
}

impl From<&TransformError> for SkippedRow {
    fn from(err: &TransformError) -> Self {
        SkippedRow {
            code: err.code().to_string(),
            reason: err.to_string(),
        }
    }
}

/// Summary of one cycle, printed by `run-once --json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Timestamp the cycle acted on; `None` when unchanged.
    pub latest_change: Option<NaiveDateTime>,
    /// Rows returned by the fetch.
    pub fetched: usize,
    pub written: WriteStats,
    pub skipped: Vec<SkippedRow>,
}

impl CycleReport {
    fn unchanged() -> Self {
        CycleReport {
            outcome: CycleOutcome::Unchanged,
            latest_change: None,
            fetched: 0,
            written: WriteStats::default(),
            skipped: Vec::new(),
        }
    }
}

// =============================================================================
// Exporter
// =============================================================================

/// Owns everything that lives across cycles.
#[derive(Debug, Clone)]
pub struct Exporter {
    detector: ChangeDetector,
    transformer: RecordTransformer,
    writer: PluFileWriter,
    price_type: i64,
}

impl Exporter {
    pub fn new(transformer: RecordTransformer, writer: PluFileWriter, price_type: i64) -> Self {
        Exporter {
            detector: ChangeDetector::new(),
            transformer,
            writer,
            price_type,
        }
    }

    /// Builds an exporter from validated configuration.
    pub fn from_config(config: &ExporterConfig) -> SyncResult<Self> {
        let transformer =
            RecordTransformer::new(config.unit_catalog()?, config.transform_options());
        let writer = PluFileWriter::new(
            config.export.plu_file_path.clone(),
            config.encoding()?,
            config.export.line_ending,
        );

        Ok(Self::new(transformer, writer, config.export.price_type))
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    pub fn writer(&self) -> &PluFileWriter {
        &self.writer
    }

    /// Runs one export cycle against `source`.
    ///
    /// ## Errors
    /// - `Config` - no units configured
    /// - data-source errors from detection or fetch
    /// - `Write` - the file could not be replaced
    ///
    /// On any error the change state stays where it was.
    pub async fn run_cycle(&mut self, source: &dyn DataSource) -> SyncResult<CycleReport> {
        let units = self.transformer.catalog().filter()?;

        let latest = match self.detector.detect(source).await? {
            Detection::Unchanged => return Ok(CycleReport::unchanged()),
            Detection::Changed { latest } => latest,
        };

        info!(latest = %latest, "Change detected, exporting");

        let mut rows = source.fetch_products(self.price_type, &units).await?;
        let fetched = rows.len();

        if rows.is_empty() {
            info!(price_type = self.price_type, "No products to export, file left unchanged");
            self.detector.commit(latest);
            return Ok(CycleReport {
                outcome: CycleOutcome::NoProducts,
                latest_change: Some(latest),
                fetched,
                written: WriteStats::default(),
                skipped: Vec::new(),
            });
        }

        rows.sort_by(|a, b| compare_codes(&a.code, &b.code));

        let mut seen = SeenCodeSet::new();
        let mut records = Vec::with_capacity(rows.len());
        let mut skipped = Vec::new();

        for row in &rows {
            match self.transformer.transform(row, &mut seen) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(code = %row.code, error = %err, "Skipping product");
                    skipped.push(SkippedRow::from(&err));
                }
            }
        }

        if records.is_empty() {
            warn!(skipped = skipped.len(), "Every product was skipped, file left unchanged");
            self.detector.commit(latest);
            return Ok(CycleReport {
                outcome: CycleOutcome::NoProducts,
                latest_change: Some(latest),
                fetched,
                written: WriteStats::default(),
                skipped,
            });
        }

        let written = self.writer.write(&records)?;
        self.detector.commit(latest);

        info!(
            records = written.records,
            skipped = skipped.len(),
            unique_codes = seen.len(),
            "PLU file successfully created"
        );

        Ok(CycleReport {
            outcome: CycleOutcome::Exported,
            latest_change: Some(latest),
            fetched,
            written,
            skipped,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::memory::{FailurePoint, MemoryProduct, MemorySource};
    use chrono::NaiveDate;
    use plu_core::{PriceMode, ProductRow, TransformOptions, UnitCatalog, UnitConfig};
    use rust_decimal::Decimal;
    use std::path::Path;

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 20)
            .unwrap()
            .and_hms_opt(12, minute, 0)
            .unwrap()
    }

    fn units() -> Vec<UnitConfig> {
        vec![
            UnitConfig {
                name: "weight".into(),
                domain_unit_id: 2,
                scale_unit_code: "4".into(),
                barcode_type: 7,
                department_prefix: 22,
                label_id: 0,
            },
            UnitConfig {
                name: "piece".into(),
                domain_unit_id: 1,
                scale_unit_code: "9".into(),
                barcode_type: 7,
                department_prefix: 23,
                label_id: 0,
            },
        ]
    }

    fn exporter(path: &Path, options: TransformOptions) -> Exporter {
        let catalog = UnitCatalog::new(units()).unwrap();
        Exporter::new(
            RecordTransformer::new(catalog, options),
            PluFileWriter::with_defaults(path),
            1,
        )
    }

    fn scaled() -> TransformOptions {
        TransformOptions {
            price_mode: PriceMode::Scaled { divider: 100 },
            ..Default::default()
        }
    }

    fn product(id: i64, code: &str, unit_id: i64, price: Decimal) -> MemoryProduct {
        MemoryProduct::new(ProductRow::new(id, code, format!("Item {}", code), unit_id, price), 1)
    }

    fn lines(path: &Path) -> Vec<String> {
        let bytes = std::fs::read(path).unwrap();
        let (text, _, _) = encoding_rs::WINDOWS_1251.decode(&bytes);
        text.split("\r\n")
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_end_to_end_two_products() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plu.txp");

        let source = MemorySource::new();
        source.set_changes(Some(at(1)), Some(at(2))).await;
        source
            .set_products(vec![
                product(1, "100", 2, Decimal::new(125, 1)),
                product(2, "101", 1, Decimal::ZERO),
            ])
            .await;

        let mut exporter = exporter(&path, scaled());
        let report = exporter.run_cycle(&source).await.unwrap();

        assert_eq!(report.outcome, CycleOutcome::Exported);
        assert_eq!(report.written.records, 1);

        let lines = lines(&path);
        assert_eq!(lines.len(), 1);
        let fields: Vec<&str> = lines[0].split('\t').collect();
        assert_eq!(fields.len(), 18);
        assert_eq!(fields[3], "100");
        assert_eq!(fields[4], "7");
        assert_eq!(fields[5], "1250");
        assert_eq!(fields[6], "4");
        assert_eq!(fields[7], "22");
    }

    #[tokio::test]
    async fn test_second_cycle_is_unchanged_and_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plu.txp");

        let source = MemorySource::new();
        source.set_changes(Some(at(1)), Some(at(1))).await;
        source.insert(product(1, "5", 1, Decimal::ONE)).await;

        let mut exporter = exporter(&path, Default::default());
        exporter.run_cycle(&source).await.unwrap();
        let first = std::fs::read(&path).unwrap();

        // Tamper with the file: an unchanged cycle must not rewrite it.
        std::fs::write(&path, b"marker").unwrap();

        let report = exporter.run_cycle(&source).await.unwrap();
        assert_eq!(report.outcome, CycleOutcome::Unchanged);
        assert_eq!(source.fetch_count(), 1);
        assert_eq!(std::fs::read(&path).unwrap(), b"marker");
        assert!(!first.is_empty());
    }

    #[tokio::test]
    async fn test_rows_sorted_by_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plu.txp");

        let source = MemorySource::new();
        source.set_changes(Some(at(1)), Some(at(1))).await;
        source
            .set_products(vec![
                product(1, "30", 1, Decimal::ONE),
                product(2, "4", 1, Decimal::ONE),
                product(3, "200", 2, Decimal::ONE),
                product(4, "17", 1, Decimal::ONE),
            ])
            .await;

        let mut exporter = exporter(&path, Default::default());
        exporter.run_cycle(&source).await.unwrap();

        let codes: Vec<String> = lines(&path)
            .iter()
            .map(|l| l.split('\t').nth(3).unwrap().to_string())
            .collect();
        assert_eq!(codes, vec!["4", "17", "30", "200"]);
    }

    #[tokio::test]
    async fn test_duplicate_articul_falls_back_to_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plu.txp");

        let source = MemorySource::new();
        source.set_changes(Some(at(1)), Some(at(1))).await;
        source
            .set_products(vec![
                MemoryProduct::new(
                    ProductRow::new(2, "20", "Second", 1, Decimal::ONE).with_articul("7"),
                    1,
                ),
                MemoryProduct::new(
                    ProductRow::new(1, "10", "First", 1, Decimal::ONE).with_articul("7"),
                    1,
                ),
            ])
            .await;

        let options = TransformOptions {
            use_unique_code: true,
            ..Default::default()
        };
        let mut exporter = exporter(&path, options);
        exporter.run_cycle(&source).await.unwrap();

        let identifiers: Vec<String> = lines(&path)
            .iter()
            .map(|l| l.split('\t').nth(2).unwrap().to_string())
            .collect();
        // Code 10 sorts first and claims articul 7.
        assert_eq!(identifiers, vec!["7", "20"]);
    }

    #[tokio::test]
    async fn test_unconvertible_price_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plu.txp");

        let source = MemorySource::new();
        source.set_changes(Some(at(1)), Some(at(1))).await;
        source
            .set_products(vec![
                product(2, "2", 2, Decimal::MAX),
                product(3, "3", 2, Decimal::ONE),
            ])
            .await;

        let mut exporter = exporter(&path, scaled());
        let report = exporter.run_cycle(&source).await.unwrap();

        assert_eq!(report.outcome, CycleOutcome::Exported);
        assert_eq!(report.fetched, 2);
        assert_eq!(report.written.records, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].code, "2");
        assert_eq!(lines(&path).len(), 1);
    }

    /// Returns its rows regardless of price type or unit filter.
    struct UnfilteredSource(Vec<ProductRow>);

    #[async_trait::async_trait]
    impl DataSource for UnfilteredSource {
        async fn latest_goods_change(&self) -> SyncResult<Option<NaiveDateTime>> {
            Ok(Some(at(1)))
        }

        async fn latest_price_change(&self) -> SyncResult<Option<NaiveDateTime>> {
            Ok(Some(at(1)))
        }

        async fn fetch_products(
            &self,
            _price_type: i64,
            _units: &plu_core::UnitFilter,
        ) -> SyncResult<Vec<ProductRow>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_unknown_unit_skipped_cycle_continues() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plu.txp");

        let source = UnfilteredSource(vec![
            ProductRow::new(1, "10", "Apples", 2, Decimal::new(5, 0)),
            ProductRow::new(2, "11", "Boxed tea", 8, Decimal::new(7, 0)),
            ProductRow::new(3, "12", "Bread", 1, Decimal::new(3, 0)),
        ]);

        let mut exporter = exporter(&path, Default::default());
        let report = exporter.run_cycle(&source).await.unwrap();

        assert_eq!(report.outcome, CycleOutcome::Exported);
        assert_eq!(report.fetched, 3);
        assert_eq!(report.written.records, 2);
        assert_eq!(
            report.skipped,
            vec![SkippedRow {
                code: "11".to_string(),
                reason: "product 11: unit 8 is not configured".to_string(),
            }]
        );

        let codes: Vec<String> = lines(&path)
            .iter()
            .map(|l| l.split('\t').nth(3).unwrap().to_string())
            .collect();
        assert_eq!(codes, vec!["10", "12"]);
        assert_eq!(exporter.detector().state().last_seen(), Some(at(1)));
    }

    #[tokio::test]
    async fn test_all_rows_skipped_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plu.txp");
        std::fs::write(&path, b"previous").unwrap();

        let source = MemorySource::new();
        source.set_changes(Some(at(1)), Some(at(1))).await;
        source.insert(product(1, "1", 2, Decimal::MAX)).await;

        let mut exporter = exporter(&path, scaled());
        let report = exporter.run_cycle(&source).await.unwrap();

        assert_eq!(report.outcome, CycleOutcome::NoProducts);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(std::fs::read(&path).unwrap(), b"previous");
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_state_and_redetects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plu.txp");

        let source = MemorySource::new();
        source.set_changes(Some(at(1)), Some(at(3))).await;
        source.insert(product(1, "1", 1, Decimal::ONE)).await;
        source.set_failure(Some(FailurePoint::Fetch)).await;

        let mut exporter = exporter(&path, Default::default());
        let err = exporter.run_cycle(&source).await.unwrap_err();
        assert!(err.is_data_source_error());
        assert!(exporter.detector().state().last_seen().is_none());
        assert!(!path.exists());

        source.set_failure(None).await;
        let report = exporter.run_cycle(&source).await.unwrap();
        assert_eq!(report.outcome, CycleOutcome::Exported);
        assert_eq!(exporter.detector().state().last_seen(), Some(at(3)));
    }

    #[tokio::test]
    async fn test_write_failure_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("plu.txp");

        let source = MemorySource::new();
        source.set_changes(Some(at(1)), Some(at(1))).await;
        source.insert(product(1, "1", 1, Decimal::ONE)).await;

        let mut exporter = exporter(&path, Default::default());
        let err = exporter.run_cycle(&source).await.unwrap_err();
        assert!(matches!(err, SyncError::Write { .. }));
        assert!(exporter.detector().state().last_seen().is_none());
    }

    #[tokio::test]
    async fn test_no_products_commits_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plu.txp");

        let source = MemorySource::new();
        source.set_changes(Some(at(1)), Some(at(1))).await;
        source.insert(product(1, "1", 1, Decimal::ZERO)).await;

        let mut exporter = exporter(&path, Default::default());
        let report = exporter.run_cycle(&source).await.unwrap();
        assert_eq!(report.outcome, CycleOutcome::NoProducts);
        assert!(!path.exists());

        let report = exporter.run_cycle(&source).await.unwrap();
        assert_eq!(report.outcome, CycleOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_empty_unit_set_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = MemorySource::new();
        source.set_changes(Some(at(1)), Some(at(1))).await;

        let mut exporter = Exporter::new(
            RecordTransformer::new(UnitCatalog::new(Vec::new()).unwrap(), Default::default()),
            PluFileWriter::with_defaults(dir.path().join("plu.txp")),
            1,
        );

        let err = exporter.run_cycle(&source).await.unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let report = CycleReport::unchanged();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "unchanged");
        assert_eq!(json["written"]["records"], 0);
    }

    #[tokio::test]
    async fn test_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ExporterConfig::default();
        config.export.plu_file_path = dir.path().join("plu.txp");

        let exporter = Exporter::from_config(&config).unwrap();
        assert_eq!(exporter.writer().path(), dir.path().join("plu.txp"));
        assert_eq!(exporter.writer().encoding(), encoding_rs::WINDOWS_1251);
    }
}
