//! # PLU File Writer
//!
//! Serializes records into the file the scale software imports.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Full Rewrite, Atomic Replace                       │
//! │                                                                         │
//! │  [OutputRecord]                                                        │
//! │       │  fields joined by \t, one record per line                       │
//! │       ▼                                                                 │
//! │  UTF-8 text ──► encoding_rs (windows-1251) ──► bytes                    │
//! │                   unmappable char → '?' (counted)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  NamedTempFile in the destination directory                            │
//! │       │  write, fsync                                                   │
//! │       ▼                                                                 │
//! │  persist() → rename over easytrade_plu.txp                             │
//! │                                                                         │
//! │  The scale never sees a half-written file.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use encoding_rs::{EncoderResult, Encoding, WINDOWS_1251};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use plu_core::OutputRecord;

use crate::error::{SyncError, SyncResult};

/// Replacement byte for characters the encoding cannot represent.
const SUBSTITUTE: u8 = b'?';

// =============================================================================
// Line Ending
// =============================================================================

/// Record terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// `\r\n`, what the Windows scale software expects.
    #[default]
    Crlf,
    /// `\n`.
    Lf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Crlf => "\r\n",
            LineEnding::Lf => "\n",
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineEnding::Crlf => write!(f, "crlf"),
            LineEnding::Lf => write!(f, "lf"),
        }
    }
}

// =============================================================================
// Writer
// =============================================================================

/// Result of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WriteStats {
    /// Lines written.
    pub records: usize,
    /// Characters replaced with `?`.
    pub substituted: usize,
    /// File size.
    pub bytes: usize,
}

/// Encoded file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFile {
    pub bytes: Vec<u8>,
    pub substituted: usize,
}

/// Writes PLU files to one destination.
#[derive(Debug, Clone)]
pub struct PluFileWriter {
    path: PathBuf,
    encoding: &'static Encoding,
    line_ending: LineEnding,
}

impl PluFileWriter {
    pub fn new(
        path: impl Into<PathBuf>,
        encoding: &'static Encoding,
        line_ending: LineEnding,
    ) -> Self {
        PluFileWriter {
            path: path.into(),
            encoding,
            line_ending,
        }
    }

    /// windows-1251 with CRLF line endings.
    pub fn with_defaults(path: impl Into<PathBuf>) -> Self {
        Self::new(path, WINDOWS_1251, LineEnding::Crlf)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Renders and encodes the records without touching the disk.
    pub fn encode(&self, records: &[OutputRecord]) -> EncodedFile {
        let terminator = self.line_ending.as_str();

        let mut text = String::new();
        for record in records {
            text.push_str(&record.to_line());
            text.push_str(terminator);
        }

        encode_lossy(self.encoding, &text)
    }

    /// Replaces the destination file with the given records.
    ///
    /// ## Errors
    /// `SyncError::Write` if the temporary file cannot be created in the
    /// destination directory, written, or renamed over the destination.
    /// The previous file stays intact in every error case.
    pub fn write(&self, records: &[OutputRecord]) -> SyncResult<WriteStats> {
        let encoded = self.encode(records);

        if encoded.substituted > 0 {
            warn!(
                substituted = encoded.substituted,
                encoding = self.encoding.name(),
                "Some characters cannot be encoded and were replaced with '?'"
            );
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| self.write_error(e))?;
        debug!(temp = %temp.path().display(), "Writing PLU file to temporary location");

        temp.write_all(&encoded.bytes)
            .and_then(|_| temp.flush())
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| self.write_error(e))?;

        temp.persist(&self.path)
            .map_err(|e| self.write_error(e.error))?;

        let stats = WriteStats {
            records: records.len(),
            substituted: encoded.substituted,
            bytes: encoded.bytes.len(),
        };

        info!(
            path = %self.path.display(),
            records = stats.records,
            bytes = stats.bytes,
            "PLU file written"
        );

        Ok(stats)
    }

    fn write_error(&self, err: std::io::Error) -> SyncError {
        SyncError::Write {
            path: self.path.clone(),
            reason: err.to_string(),
        }
    }
}

/// Encodes `text`, substituting `?` for every unmappable character.
fn encode_lossy(encoding: &'static Encoding, text: &str) -> EncodedFile {
    let mut encoder = encoding.new_encoder();
    let mut bytes = Vec::with_capacity(text.len());
    let mut substituted = 0;
    let mut rest = text;

    loop {
        let (result, read) =
            encoder.encode_from_utf8_to_vec_without_replacement(rest, &mut bytes, true);
        rest = &rest[read..];

        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => {
                let needed = encoder
                    .max_buffer_length_from_utf8_without_replacement(rest.len())
                    .unwrap_or(rest.len());
                bytes.reserve(needed.max(1));
            }
            EncoderResult::Unmappable(_) => {
                bytes.push(SUBSTITUTE);
                substituted += 1;
            }
        }
    }

    EncodedFile { bytes, substituted }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use plu_core::{DevicePrice, FormatVersion};

    fn record(code: &str, name: &str) -> OutputRecord {
        OutputRecord {
            format: FormatVersion::A,
            hotkey: "0".to_string(),
            name: name.to_string(),
            identifier: code.to_string(),
            code: code.to_string(),
            barcode_type: 7,
            unit_price: DevicePrice::new(1250),
            scale_unit_code: "4".to_string(),
            department_prefix: 22,
            shelf_time: 15,
            label_id: 0,
        }
    }

    #[test]
    fn test_cyrillic_encoded_as_windows_1251() {
        let writer = PluFileWriter::with_defaults("plu.txp");
        let encoded = writer.encode(&[record("1", "Сыр")]);

        // С = 0xD1, ы = 0xFB, р = 0xF0
        let expected_name = [0xD1u8, 0xFB, 0xF0];
        assert!(encoded
            .bytes
            .windows(expected_name.len())
            .any(|w| w == expected_name));
        assert_eq!(encoded.substituted, 0);
        assert!(encoded.bytes.ends_with(b"\t0\t0\r\n"));
    }

    #[test]
    fn test_unmappable_characters_substituted() {
        let writer = PluFileWriter::with_defaults("plu.txp");
        let encoded = writer.encode(&[record("1", "Tea 茶🍵")]);

        assert_eq!(encoded.substituted, 2);
        let text = String::from_utf8_lossy(&encoded.bytes);
        assert!(text.contains("Tea ??\t"));
    }

    #[test]
    fn test_line_endings() {
        let records = [record("1", "A"), record("2", "B")];

        let crlf = PluFileWriter::with_defaults("plu.txp").encode(&records);
        assert_eq!(crlf.bytes.iter().filter(|b| **b == b'\r').count(), 2);

        let lf = PluFileWriter::new("plu.txp", WINDOWS_1251, LineEnding::Lf).encode(&records);
        assert!(!lf.bytes.contains(&b'\r'));
        assert_eq!(lf.bytes.iter().filter(|b| **b == b'\n').count(), 2);
    }

    #[test]
    fn test_write_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("easytrade_plu.txp");
        std::fs::write(&path, b"old content").unwrap();

        let writer = PluFileWriter::with_defaults(&path);
        let stats = writer.write(&[record("100", "Milk")]).unwrap();

        assert_eq!(stats.records, 1);
        let content = std::fs::read(&path).unwrap();
        assert_eq!(content.len(), stats.bytes);
        assert!(content.starts_with(b"0\tMilk\t100\t100\t7\t1250\t"));

        // Only the destination remains, no temp files.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("plu.txp");

        let err = PluFileWriter::with_defaults(&path)
            .write(&[record("1", "A")])
            .unwrap_err();
        assert!(matches!(err, SyncError::Write { .. }));
    }
}
