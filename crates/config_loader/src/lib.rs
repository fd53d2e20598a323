//! # Config Loader
//!
//! Loads logger settings from disk.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate field ranges and cross-field rules
//! - Produce a `LoggerBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("logger.toml")).unwrap();
//! println!("Session: {}", blueprint.session.name);
//! ```

mod parser;
mod validator;

pub use contracts::LoggerBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file path
    ///
    /// The format is taken from the extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<LoggerBlueprint, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from a string
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<LoggerBlueprint, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Validate an already-built blueprint
    pub fn validate(blueprint: &LoggerBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    pub fn to_toml(blueprint: &LoggerBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(blueprint: &LoggerBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<LoggerBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::CompressionKind;

    const TRACK_DAY_TOML: &str = r#"
[session]
name = "Track Day"
driver = "Alex"
vehicle = "Miata NB"
weather = 1
ambient_temp_c = 24.5

[[hardware]]
class = "accelerometer"
connection = "i2c"
identifier = "LIS3DH@0x18"

[[hardware]]
class = "gps"
connection = "uart"
identifier = "PA1010D"

[flush]
gforce_threshold = 2.5
event_rate_limit_s = 1.0
time_threshold_s = 120.0

[queue]
capacity = 1024

[storage]
base_path = "/sd/logs"
capacity_bytes = 33554432
compression = "deflate"

[retention]
high_water = 0.85
low_water = 0.5
interval_s = 30

[producer]
fifo_poll_interval_ms = 40
watermark = 8
gps_rate_hz = 5.0
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(TRACK_DAY_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.session.name, "Track Day");
        assert_eq!(bp.hardware.len(), 2);
        assert_eq!(bp.queue.capacity, 1024);
        assert_eq!(bp.storage.compression, CompressionKind::Deflate);
        assert_eq!(bp.retention.interval_s, 30);
        assert_eq!(bp.producer.watermark, 8);
    }

    #[test]
    fn test_round_trip_toml() {
        let bp = ConfigLoader::load_from_str(TRACK_DAY_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(bp.session.name, bp2.session.name);
        assert_eq!(bp.hardware, bp2.hardware);
        assert_eq!(bp.storage.capacity_bytes, bp2.storage.capacity_bytes);
    }

    #[test]
    fn test_round_trip_json() {
        let bp = ConfigLoader::load_from_str(TRACK_DAY_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&bp).unwrap();
        let bp2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(bp.session.vehicle, bp2.session.vehicle);
        assert_eq!(bp.flush.time_threshold_s, bp2.flush.time_threshold_s);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[session]
name = "Track Day"

[storage]
base_path = "/sd"

[retention]
high_water = 0.5
low_water = 0.7
"#;
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logger.toml");
        std::fs::write(&path, TRACK_DAY_TOML).unwrap();
        let bp = ConfigLoader::load_from_path(&path).unwrap();
        assert_eq!(bp.session.driver, "Alex");

        let yaml = dir.path().join("logger.yaml");
        std::fs::write(&yaml, "session: {}").unwrap();
        assert!(ConfigLoader::load_from_path(&yaml)
            .unwrap_err()
            .to_string()
            .contains("unsupported"));
    }
}
