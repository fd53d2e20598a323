//! LoggerBlueprint - Config Loader output
//!
//! Describes a complete logger deployment: session metadata, hardware
//! provenance, flush policy, queue sizing, storage backend, retention and
//! producer pacing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{HardwareItem, SessionMetadata, DEFAULT_QUEUE_CAPACITY};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete logger configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggerBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Session metadata written into every session header
    #[validate(nested)]
    pub session: SessionConfig,

    /// Hardware provenance entries re-registered before every session start
    #[serde(default)]
    pub hardware: Vec<HardwareItem>,

    /// Flush policy thresholds
    #[serde(default)]
    pub flush: FlushConfig,

    /// Sample queue sizing
    #[serde(default)]
    #[validate(nested)]
    pub queue: QueueConfig,

    /// Storage backend
    #[validate(nested)]
    pub storage: StorageConfig,

    /// Retention water marks
    #[serde(default)]
    #[validate(nested)]
    pub retention: RetentionSettings,

    /// Producer pacing (outside the core)
    #[serde(default)]
    #[validate(nested)]
    pub producer: ProducerConfig,
}

/// Session metadata section
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionConfig {
    /// Session name
    #[validate(length(min = 1))]
    pub name: String,

    /// Driver / operator
    #[serde(default)]
    pub driver: String,

    /// Vehicle / asset identifier
    #[serde(default)]
    pub vehicle: String,

    /// Ordinal weather code
    #[serde(default)]
    pub weather: u8,

    /// Ambient temperature (°C)
    #[serde(default)]
    pub ambient_temp_c: f32,

    /// Configuration checksum stored in the header
    #[serde(default)]
    pub config_crc: u32,
}

impl SessionConfig {
    /// Convert into the metadata passed to `SessionManager::start`
    pub fn to_metadata(&self) -> SessionMetadata {
        SessionMetadata {
            name: self.name.clone(),
            driver: self.driver.clone(),
            vehicle: self.vehicle.clone(),
            weather: self.weather,
            ambient_temp_c: self.ambient_temp_c,
            config_crc: self.config_crc,
        }
    }
}

/// Flush policy thresholds
///
/// Values are applied through best-effort setters; invalid values are
/// ignored at runtime rather than rejected here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushConfig {
    /// Event trigger threshold (g)
    #[serde(default = "default_gforce_threshold")]
    pub gforce_threshold: f32,

    /// Minimum spacing between event-triggered flushes (seconds)
    #[serde(default = "default_event_rate_limit")]
    pub event_rate_limit_s: f64,

    /// Time trigger threshold (seconds)
    #[serde(default = "default_time_threshold")]
    pub time_threshold_s: f64,
}

fn default_gforce_threshold() -> f32 {
    3.0
}

fn default_event_rate_limit() -> f64 {
    1.0
}

fn default_time_threshold() -> f64 {
    300.0
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            gforce_threshold: default_gforce_threshold(),
            event_rate_limit_s: default_event_rate_limit(),
            time_threshold_s: default_time_threshold(),
        }
    }
}

/// Sample queue configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QueueConfig {
    /// Slot count (one slot is reserved to tell full from empty)
    #[validate(range(min = 2))]
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StorageConfig {
    /// Directory session files are written to
    pub base_path: PathBuf,

    /// Capacity quota in bytes (None = report no capacity, retention idle)
    #[serde(default)]
    #[validate(range(min = 1))]
    pub capacity_bytes: Option<u64>,

    /// Optional transform applied to encoded bytes before writing
    #[serde(default)]
    pub compression: CompressionKind,
}

/// Compression applied to encoded record bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionKind {
    /// Write records as encoded
    #[default]
    None,
    /// Deflate each write call
    Deflate,
}

/// Retention water marks (fractions of total capacity)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RetentionSettings {
    /// Run retention at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Usage fraction that triggers cleanup
    #[serde(default = "default_high_water")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub high_water: f64,

    /// Usage fraction cleanup aims for
    #[serde(default = "default_low_water")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub low_water: f64,

    /// Seconds between retention checks
    #[serde(default = "default_retention_interval")]
    #[validate(range(min = 1))]
    pub interval_s: u64,
}

fn default_true() -> bool {
    true
}

fn default_high_water() -> f64 {
    0.90
}

fn default_low_water() -> f64 {
    0.60
}

fn default_retention_interval() -> u64 {
    60
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            high_water: default_high_water(),
            low_water: default_low_water(),
            interval_s: default_retention_interval(),
        }
    }
}

/// Producer-side pacing
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProducerConfig {
    /// Accelerometer FIFO poll interval (ms)
    #[serde(default = "default_fifo_poll_interval")]
    #[validate(range(min = 1))]
    pub fifo_poll_interval_ms: u64,

    /// Samples drained per FIFO poll
    #[serde(default = "default_watermark")]
    #[validate(range(min = 1, max = 31))]
    pub watermark: u8,

    /// GPS fix rate (Hz)
    #[serde(default = "default_gps_rate")]
    #[validate(range(min = 0.1, max = 50.0))]
    pub gps_rate_hz: f64,
}

fn default_fifo_poll_interval() -> u64 {
    50
}

fn default_watermark() -> u8 {
    16
}

fn default_gps_rate() -> f64 {
    10.0
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            fifo_poll_interval_ms: default_fifo_poll_interval(),
            watermark: default_watermark(),
            gps_rate_hz: default_gps_rate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let flush = FlushConfig::default();
        assert_eq!(flush.gforce_threshold, 3.0);
        assert_eq!(flush.event_rate_limit_s, 1.0);
        assert_eq!(flush.time_threshold_s, 300.0);

        let retention = RetentionSettings::default();
        assert_eq!(retention.high_water, 0.90);
        assert_eq!(retention.low_water, 0.60);

        assert_eq!(QueueConfig::default().capacity, 2048);
    }

    #[test]
    fn test_minimal_json() {
        let json = r#"{
            "session": { "name": "Track Day" },
            "storage": { "base_path": "/sd" }
        }"#;
        let bp: LoggerBlueprint = serde_json::from_str(json).unwrap();
        assert_eq!(bp.session.name, "Track Day");
        assert!(bp.hardware.is_empty());
        assert_eq!(bp.storage.compression, CompressionKind::None);
        assert!(bp.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_watermark() {
        let json = r#"{
            "session": { "name": "x" },
            "storage": { "base_path": "/sd" },
            "producer": { "watermark": 40 }
        }"#;
        let bp: LoggerBlueprint = serde_json::from_str(json).unwrap();
        assert!(bp.validate().is_err());
    }
}
