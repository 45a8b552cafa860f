//! # Exporter Configuration
//!
//! Configuration management for the PLU exporter.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PLU_DB_HOST=10.0.0.5                                               │
//! │     PLU_FILE_PATH=D:\scales\plu.txp                                    │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/plu-sync/plu.toml (Linux)                                │
//! │     %APPDATA%\plu\sync\config\plu.toml (Windows)                       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     written to disk when the file is missing or unreadable TOML        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! host = "localhost"
//! port = 3306
//! database = "easytrade_db"
//! user = "easytrade"
//! password = "masterkey"
//!
//! [export]
//! price_type = 1
//! check_time_secs = 10
//! plu_file_path = 'C:\Program Files (x86)\RLS1000\easytrade_plu.txp'
//! format_version = "a"
//!
//! [export.price_scaling]
//! enabled = true
//! divider = 100
//!
//! [[units]]
//! name = "Весовой"
//! domain_unit_id = 2
//! scale_unit_code = "4"
//! barcode_type = 7
//! department_prefix = 22
//! label_id = 0
//! ```

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use plu_core::{
    FormatVersion, PriceMode, TransformOptions, UnitCatalog, UnitConfig, ValidationError,
    DEFAULT_SHELF_TIME,
};
use plu_db::DbConfig;

use crate::error::{SyncError, SyncResult};
use crate::writer::LineEnding;

/// File name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "plu.toml";

// =============================================================================
// Database Settings
// =============================================================================

/// Connection settings for the EasyTrade database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,

    /// Connect/acquire timeout (seconds).
    pub connect_timeout_secs: u64,

    /// Issue `RESET QUERY CACHE` before reading.
    /// Only meaningful on MySQL 5.x / MariaDB with the query cache enabled.
    pub reset_query_cache: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            host: "localhost".to_string(),
            port: plu_db::pool::DEFAULT_PORT,
            database: "easytrade_db".to_string(),
            user: "easytrade".to_string(),
            password: "masterkey".to_string(),
            connect_timeout_secs: 10,
            reset_query_cache: false,
        }
    }
}

// =============================================================================
// Export Settings
// =============================================================================

/// Price conversion switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PriceScaling {
    /// Multiply prices by `divider` before truncation.
    pub enabled: bool,

    /// Multiplier (100 turns 12.50 into 1250).
    pub divider: u32,
}

impl Default for PriceScaling {
    fn default() -> Self {
        PriceScaling {
            enabled: true,
            divider: 100,
        }
    }
}

/// What to export, how often, and where to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSettings {
    /// Price list to export (`prc_type`).
    pub price_type: i64,

    /// Interval between cycles (seconds).
    pub check_time_secs: u64,

    /// Pause after an unexpected fault (seconds). Derived from the interval
    /// when unset; values not above the interval are raised to that.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault_cooldown_secs: Option<u64>,

    /// Destination PLU file, replaced on every export.
    pub plu_file_path: PathBuf,

    /// Column layout expected by the scale software.
    pub format_version: FormatVersion,

    /// Use the product articul as the device identifier when valid.
    pub use_unique_code: bool,

    /// Use the product description as the hotkey.
    pub use_description_as_hotkey: bool,

    /// Shelf life column value (days).
    pub shelf_time: u32,

    /// Output encoding label (any single-byte WHATWG label).
    pub encoding: String,

    /// Line terminator.
    pub line_ending: LineEnding,

    pub price_scaling: PriceScaling,
}

/// Lower bound of the fault cooldown when none is configured.
pub const DEFAULT_FAULT_COOLDOWN_SECS: u64 = 60;

/// Longest accepted interval between cycles (one day).
const MAX_CHECK_TIME_SECS: u64 = 86_400;

fn default_plu_file_path() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\Program Files (x86)\RLS1000\easytrade_plu.txp")
    } else {
        PathBuf::from("easytrade_plu.txp")
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        ExportSettings {
            price_type: 1,
            check_time_secs: 10,
            fault_cooldown_secs: None,
            plu_file_path: default_plu_file_path(),
            format_version: FormatVersion::A,
            use_unique_code: false,
            use_description_as_hotkey: false,
            shelf_time: DEFAULT_SHELF_TIME,
            encoding: "windows-1251".to_string(),
            line_ending: LineEnding::Crlf,
            price_scaling: PriceScaling::default(),
        }
    }
}

fn default_units() -> Vec<UnitConfig> {
    vec![
        UnitConfig {
            name: "Весовой".to_string(),
            domain_unit_id: 2,
            scale_unit_code: "4".to_string(),
            barcode_type: 7,
            department_prefix: 22,
            label_id: 0,
        },
        UnitConfig {
            name: "Штучный".to_string(),
            domain_unit_id: 1,
            scale_unit_code: "9".to_string(),
            barcode_type: 7,
            department_prefix: 23,
            label_id: 0,
        },
    ]
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete exporter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub export: ExportSettings,

    #[serde(default = "default_units")]
    pub units: Vec<UnitConfig>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        ExporterConfig {
            database: DatabaseSettings::default(),
            export: ExportSettings::default(),
            units: default_units(),
        }
    }
}

impl ExporterConfig {
    /// Loads configuration from `config_path` or the platform default path.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (plu.toml)
    /// 3. Environment variables
    ///
    /// ## Errors
    /// Only unrecoverable problems: no usable path, a file that can be
    /// neither read nor replaced, or settings that fail validation.
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::Config("No config path available".into()))?;

        let mut config = Self::load_or_init(&path)?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Reads the file, creating or repairing it with defaults when needed.
    ///
    /// ## Recovery
    /// ```text
    /// missing file      → write defaults, use defaults
    /// not UTF-8         → rename to <name>.bak, write defaults, use defaults
    /// unparsable TOML   → rename to <name>.bak, write defaults, use defaults
    /// unreadable file   → error (permissions, I/O)
    /// ```
    pub fn load_or_init(path: &Path) -> SyncResult<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, writing defaults");
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        info!(path = %path.display(), "Loading config from file");
        let bytes = std::fs::read(path).map_err(|e| {
            SyncError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;

        let contents = match String::from_utf8(bytes) {
            Ok(contents) => contents,
            Err(e) => return Self::replace_corrupt(path, &e),
        };

        match toml::from_str::<Self>(&contents) {
            Ok(config) => Ok(config),
            Err(e) => Self::replace_corrupt(path, &e),
        }
    }

    /// Moves a corrupt file aside and writes defaults in its place.
    fn replace_corrupt(path: &Path, error: &dyn std::fmt::Display) -> SyncResult<Self> {
        let backup = backup_path(path);
        warn!(
            path = %path.display(),
            backup = %backup.display(),
            error = %error,
            "Config file is corrupt, replacing it with defaults"
        );

        std::fs::rename(path, &backup).map_err(|e| {
            SyncError::Config(format!("Cannot back up {}: {}", path.display(), e))
        })?;

        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, path: &Path) -> SyncResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SyncError::Config(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|e| {
            SyncError::Config(format!("Cannot write {}: {}", path.display(), e))
        })?;

        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let export = &self.export;

        if !(1..=MAX_CHECK_TIME_SECS).contains(&export.check_time_secs) {
            return Err(ValidationError::OutOfRange {
                field: "check_time_secs".to_string(),
                min: 1,
                max: MAX_CHECK_TIME_SECS as i64,
            }
            .into());
        }

        if export.price_scaling.divider == 0 {
            return Err(ValidationError::OutOfRange {
                field: "price_scaling.divider".to_string(),
                min: 1,
                max: u32::MAX as i64,
            }
            .into());
        }

        if export.plu_file_path.as_os_str().is_empty() {
            return Err(ValidationError::Required {
                field: "plu_file_path".to_string(),
            }
            .into());
        }

        self.encoding()?;

        // Duplicate unit ids; an empty list is reported per cycle instead.
        UnitCatalog::new(self.units.iter().cloned())?;

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key/value lookup.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("PLU_DB_HOST") {
            debug!(host = %host, "Overriding database host from environment");
            self.database.host = host;
        }

        if let Some(port) = lookup("PLU_DB_PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.database.port = p,
                Err(_) => warn!(value = %port, "Ignoring invalid PLU_DB_PORT"),
            }
        }

        if let Some(name) = lookup("PLU_DB_NAME") {
            self.database.database = name;
        }

        if let Some(user) = lookup("PLU_DB_USER") {
            self.database.user = user;
        }

        if let Some(password) = lookup("PLU_DB_PASSWORD") {
            self.database.password = password;
        }

        if let Some(path) = lookup("PLU_FILE_PATH") {
            debug!(path = %path, "Overriding PLU file path from environment");
            self.export.plu_file_path = PathBuf::from(path);
        }

        if let Some(secs) = lookup("PLU_CHECK_TIME") {
            match secs.parse::<u64>() {
                Ok(s) => self.export.check_time_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid PLU_CHECK_TIME"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "plu", "plu-sync")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Connection settings for plu-db.
    pub fn db_config(&self) -> DbConfig {
        let db = &self.database;
        DbConfig::new(&db.host, &db.database, &db.user, &db.password)
            .port(db.port)
            .connect_timeout(Duration::from_secs(db.connect_timeout_secs))
    }

    /// Price conversion mode.
    pub fn price_mode(&self) -> PriceMode {
        let scaling = self.export.price_scaling;
        PriceMode::from_scaling(scaling.enabled, scaling.divider)
    }

    /// Record transformation switches.
    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            price_mode: self.price_mode(),
            use_unique_code: self.export.use_unique_code,
            use_description_as_hotkey: self.export.use_description_as_hotkey,
            format: self.export.format_version,
            shelf_time: self.export.shelf_time,
        }
    }

    /// Unit catalog built from `[[units]]`.
    pub fn unit_catalog(&self) -> SyncResult<UnitCatalog> {
        Ok(UnitCatalog::new(self.units.iter().cloned())?)
    }

    /// Resolved output encoding.
    ///
    /// ## Errors
    /// Unknown labels and multi-byte encodings.
    pub fn encoding(&self) -> SyncResult<&'static Encoding> {
        let label = self.export.encoding.as_str();
        let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
            ValidationError::InvalidFormat {
                field: "encoding".to_string(),
                reason: format!("unknown label '{}'", label),
            }
        })?;

        if !encoding.is_single_byte() {
            return Err(ValidationError::InvalidFormat {
                field: "encoding".to_string(),
                reason: format!("'{}' is not a single-byte encoding", label),
            }
            .into());
        }

        Ok(encoding)
    }

    /// Interval between cycles.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.export.check_time_secs)
    }

    /// Pause after an unexpected fault, always longer than the interval.
    ///
    /// Unset: `max(60, 2 × check_time_secs)`. An explicit value that does not
    /// exceed the interval is raised to that as well.
    pub fn fault_cooldown(&self) -> Duration {
        let interval = self.export.check_time_secs;
        let derived = DEFAULT_FAULT_COOLDOWN_SECS.max(interval.saturating_mul(2));

        let secs = match self.export.fault_cooldown_secs {
            Some(secs) if secs > interval => secs,
            Some(secs) => {
                warn!(
                    fault_cooldown_secs = secs,
                    check_time_secs = interval,
                    using = derived,
                    "fault_cooldown_secs must exceed check_time_secs, raising it"
                );
                derived
            }
            None => derived,
        };

        Duration::from_secs(secs)
    }

    /// Copy with the password masked, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.database.password = "***".to_string();
        config
    }
}

/// `plu.toml` → `plu.toml.bak`.
fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ExporterConfig::default();
        assert_eq!(config.database.host, "localhost");
        assert_eq!(config.database.database, "easytrade_db");
        assert_eq!(config.export.price_type, 1);
        assert_eq!(config.export.check_time_secs, 10);
        assert_eq!(config.price_mode(), PriceMode::Scaled { divider: 100 });
        assert_eq!(config.units.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ExporterConfig::default();

        config.export.price_scaling.divider = 0;
        assert!(config.validate().is_err());

        config.export.price_scaling.divider = 100;
        config.export.check_time_secs = 0;
        assert!(config.validate().is_err());

        config.export.check_time_secs = 86_401;
        assert!(config.validate().is_err());

        config.export.check_time_secs = 10;
        config.export.plu_file_path = PathBuf::new();
        assert!(config.validate().is_err());

        config.export.plu_file_path = PathBuf::from("plu.txp");

        config.export.check_time_secs = 10;
        config.export.encoding = "utf-8".to_string();
        assert!(config.validate().unwrap_err().is_config_error());

        config.export.encoding = "koi8-r".to_string();
        assert!(config.validate().is_ok());

        config.units.push(config.units[0].clone());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_units_pass_startup_validation() {
        let config = ExporterConfig {
            units: Vec::new(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_encoding() {
        let mut config = ExporterConfig::default();
        config.export.encoding = "klingon".to_string();
        assert!(config.encoding().is_err());
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let config = ExporterConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[export.price_scaling]"));
        assert!(toml_str.contains("[[units]]"));

        let parsed: ExporterConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ExporterConfig = toml::from_str(
            r#"
            [database]
            host = "10.0.0.5"

            [export]
            format_version = "b"
            line_ending = "lf"

            [[units]]
            domain_unit_id = 3
            scale_unit_code = 4
            barcode_type = 7
            department_prefix = 22
            label_id = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.database.host, "10.0.0.5");
        assert_eq!(config.database.user, "easytrade");
        assert_eq!(config.export.format_version, FormatVersion::B);
        assert_eq!(config.export.line_ending, LineEnding::Lf);
        assert_eq!(config.units.len(), 1);
        assert_eq!(config.units[0].scale_unit_code, "4");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = toml::from_str::<ExporterConfig>("[export]\nprice_typo = 2\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("plu.toml");

        let config = ExporterConfig::load_or_init(&path).unwrap();
        assert_eq!(config, ExporterConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_file_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plu.toml");
        std::fs::write(&path, "[database\nhost = ").unwrap();

        let config = ExporterConfig::load_or_init(&path).unwrap();
        assert_eq!(config, ExporterConfig::default());

        let backup = dir.path().join("plu.toml.bak");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "[database\nhost = ");

        let rewritten: ExporterConfig =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(rewritten, ExporterConfig::default());
    }

    #[test]
    fn test_non_utf8_file_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plu.toml");
        // "Вес" in windows-1251
        let legacy = b"[[units]]\nname = \"\xC2\xE5\xF1\"\n".to_vec();
        std::fs::write(&path, &legacy).unwrap();

        let config = ExporterConfig::load_or_init(&path).unwrap();
        assert_eq!(config, ExporterConfig::default());

        let backup = dir.path().join("plu.toml.bak");
        assert_eq!(std::fs::read(backup).unwrap(), legacy);
        assert!(std::fs::read_to_string(&path).is_ok());
    }

    #[test]
    fn test_long_interval_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plu.toml");
        std::fs::write(&path, "[export]\ncheck_time_secs = 120\n").unwrap();

        let config = ExporterConfig::load(Some(path)).unwrap();
        assert_eq!(config.check_interval(), Duration::from_secs(120));
        assert_eq!(config.fault_cooldown(), Duration::from_secs(240));
    }

    #[test]
    fn test_fault_cooldown_resolution() {
        let mut config = ExporterConfig::default();
        assert_eq!(config.fault_cooldown(), Duration::from_secs(60));

        config.export.fault_cooldown_secs = Some(300);
        assert_eq!(config.fault_cooldown(), Duration::from_secs(300));

        // Not above the interval: raised instead of rejected.
        config.export.check_time_secs = 45;
        config.export.fault_cooldown_secs = Some(30);
        assert!(config.validate().is_ok());
        assert_eq!(config.fault_cooldown(), Duration::from_secs(90));
    }

    #[test]
    fn test_load_rejects_invalid_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plu.toml");
        std::fs::write(&path, "[export.price_scaling]\ndivider = 0\n").unwrap();

        assert!(ExporterConfig::load(Some(path)).is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("PLU_DB_HOST", "db.shop"),
            ("PLU_DB_PORT", "3307"),
            ("PLU_FILE_PATH", "/srv/plu.txp"),
            ("PLU_CHECK_TIME", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = ExporterConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.host, "db.shop");
        assert_eq!(config.database.port, 3307);
        assert_eq!(config.export.plu_file_path, PathBuf::from("/srv/plu.txp"));
        assert_eq!(config.export.check_time_secs, 10);
    }

    #[test]
    fn test_derived_settings() {
        let mut config = ExporterConfig::default();
        config.export.price_scaling.enabled = false;
        config.export.use_unique_code = true;

        let options = config.transform_options();
        assert_eq!(options.price_mode, PriceMode::Direct);
        assert!(options.use_unique_code);
        assert_eq!(options.shelf_time, 15);

        assert_eq!(config.db_config().port, 3306);
        assert_eq!(config.check_interval(), Duration::from_secs(10));
        assert_eq!(config.redacted().database.password, "***");
        assert_eq!(config.unit_catalog().unwrap().len(), 2);
    }
}
