//! Sample - Ingestion output
//!
//! Timestamped sensor measurements moved from producer to queue to consumer.

use serde::{Deserialize, Serialize};

use crate::limits::{truncate_utf8, MAX_MARKER_LEN, MAX_SATELLITES};

/// Timestamped measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Monotonic clock reading (microseconds)
    pub timestamp_us: u64,

    /// Measurement payload
    pub reading: Reading,
}

impl Sample {
    /// Accelerometer sample (g)
    pub fn accel(x: f32, y: f32, z: f32, timestamp_us: u64) -> Self {
        Self {
            timestamp_us,
            reading: Reading::Accel(Vector3 { x, y, z }),
        }
    }

    /// Positional fix sample
    pub fn gps(fix: GpsFix, timestamp_us: u64) -> Self {
        Self {
            timestamp_us,
            reading: Reading::Gps(fix),
        }
    }

    /// Gyroscope sample (deg/s)
    pub fn gyro(x: f32, y: f32, z: f32, timestamp_us: u64) -> Self {
        Self {
            timestamp_us,
            reading: Reading::Gyro(Vector3 { x, y, z }),
        }
    }

    /// Magnetometer sample (µT)
    pub fn magnetometer(x: f32, y: f32, z: f32, timestamp_us: u64) -> Self {
        Self {
            timestamp_us,
            reading: Reading::Magnetometer(Vector3 { x, y, z }),
        }
    }

    /// Satellites-in-view sample, truncated to `MAX_SATELLITES`
    pub fn gps_satellites(mut satellites: Vec<Satellite>, timestamp_us: u64) -> Self {
        satellites.truncate(MAX_SATELLITES);
        Self {
            timestamp_us,
            reading: Reading::GpsSatellites { satellites },
        }
    }

    /// Free-text event marker, truncated to `MAX_MARKER_LEN` bytes
    pub fn marker(message: &str, timestamp_us: u64) -> Self {
        Self {
            timestamp_us,
            reading: Reading::Marker {
                message: truncate_utf8(message, MAX_MARKER_LEN).to_string(),
            },
        }
    }

    /// Total acceleration in g, `None` for non-accelerometer readings
    pub fn g_force(&self) -> Option<f32> {
        match &self.reading {
            Reading::Accel(v) => Some(v.magnitude()),
            _ => None,
        }
    }
}

/// Sensor reading variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reading {
    /// Accelerometer (g)
    Accel(Vector3),

    /// Positional fix
    Gps(GpsFix),

    /// Gyroscope (deg/s)
    Gyro(Vector3),

    /// Magnetometer (µT)
    Magnetometer(Vector3),

    /// Satellites in view
    GpsSatellites { satellites: Vec<Satellite> },

    /// Operator annotation or metadata comment
    Marker { message: String },
}

impl Reading {
    /// Short name used in logs and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            Reading::Accel(_) => "accel",
            Reading::Gps(_) => "gps",
            Reading::Gyro(_) => "gyro",
            Reading::Magnetometer(_) => "magnetometer",
            Reading::GpsSatellites { .. } => "satellites",
            Reading::Marker { .. } => "marker",
        }
    }
}

/// GPS fix
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    /// Latitude (degrees)
    pub latitude: f64,

    /// Longitude (degrees)
    pub longitude: f64,

    /// Altitude (meters)
    pub altitude: f32,

    /// Ground speed (m/s)
    pub speed: f32,

    /// Course over ground (degrees)
    pub heading: f32,

    /// Horizontal dilution of precision
    pub hdop: f32,
}

impl GpsFix {
    /// Fix with only a position, remaining fields zero
    pub fn position(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Default::default()
        }
    }
}

/// One satellite in view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Satellite {
    /// PRN / satellite id
    pub id: u8,

    /// Azimuth (degrees, 0-360)
    pub azimuth: u16,

    /// Elevation (degrees, 0-90)
    pub elevation: u8,

    /// Signal to noise ratio (dB-Hz, 0-99)
    pub snr: u8,
}

impl Satellite {
    /// Satellite with fields clamped to their valid ranges
    pub fn new(id: u8, azimuth: u16, elevation: u8, snr: u8) -> Self {
        Self {
            id,
            azimuth: azimuth.min(360),
            elevation: elevation.min(90),
            snr: snr.min(99),
        }
    }
}

/// 3-axis vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    /// Euclidean norm
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}
