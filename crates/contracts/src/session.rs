//! Session identity, metadata and hardware provenance.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// XOR constant mixed into the second id half
pub const SESSION_ID_XOR: u64 = 0xDEAD_BEEF_1234_5678;

/// 128-bit session identifier
///
/// Derived from a monotonic clock reading; not cryptographically unique.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SessionId {
    pub part1: u64,
    pub part2: u64,
}

impl SessionId {
    /// Derive an id from a clock reading
    pub fn from_clock(now_us: u64) -> Self {
        Self {
            part1: now_us,
            part2: now_us ^ SESSION_ID_XOR,
        }
    }

    /// On-disk representation (two little-endian u64)
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.part1.to_le_bytes());
        out[8..].copy_from_slice(&self.part2.to_le_bytes());
        out
    }

    /// Inverse of [`SessionId::to_bytes`]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let mut lo = [0u8; 8];
        let mut hi = [0u8; 8];
        lo.copy_from_slice(&bytes[..8]);
        hi.copy_from_slice(&bytes[8..]);
        Self {
            part1: u64::from_le_bytes(lo),
            part2: u64::from_le_bytes(hi),
        }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.to_bytes() {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({self})")
    }
}

/// Human-supplied session metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Session name (e.g., "Track Day")
    pub name: String,

    /// Driver / operator
    pub driver: String,

    /// Vehicle / asset identifier
    pub vehicle: String,

    /// Ordinal weather code
    #[serde(default)]
    pub weather: u8,

    /// Ambient temperature (°C), stored as tenths of a degree
    #[serde(default)]
    pub ambient_temp_c: f32,

    /// Caller-supplied configuration checksum
    #[serde(default)]
    pub config_crc: u32,
}

/// Hardware class byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareClass {
    Accelerometer,
    Gps,
    Display,
    Storage,
    Rtc,
    Led,
    Neopixel,
    Radio,
    Obd,
    Can,
    Other(u8),
}

impl From<u8> for HardwareClass {
    fn from(v: u8) -> Self {
        match v {
            0x01 => Self::Accelerometer,
            0x02 => Self::Gps,
            0x03 => Self::Display,
            0x04 => Self::Storage,
            0x05 => Self::Rtc,
            0x06 => Self::Led,
            0x07 => Self::Neopixel,
            0x08 => Self::Radio,
            0x09 => Self::Obd,
            0x0A => Self::Can,
            other => Self::Other(other),
        }
    }
}

impl From<HardwareClass> for u8 {
    fn from(c: HardwareClass) -> Self {
        match c {
            HardwareClass::Accelerometer => 0x01,
            HardwareClass::Gps => 0x02,
            HardwareClass::Display => 0x03,
            HardwareClass::Storage => 0x04,
            HardwareClass::Rtc => 0x05,
            HardwareClass::Led => 0x06,
            HardwareClass::Neopixel => 0x07,
            HardwareClass::Radio => 0x08,
            HardwareClass::Obd => 0x09,
            HardwareClass::Can => 0x0A,
            HardwareClass::Other(v) => v,
        }
    }
}

/// Connection class byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionClass {
    I2c,
    Spi,
    Uart,
    Gpio,
    StemmaQt,
    Builtin,
    Other(u8),
}

impl From<u8> for ConnectionClass {
    fn from(v: u8) -> Self {
        match v {
            0x01 => Self::I2c,
            0x02 => Self::Spi,
            0x03 => Self::Uart,
            0x04 => Self::Gpio,
            0x05 => Self::StemmaQt,
            0x06 => Self::Builtin,
            other => Self::Other(other),
        }
    }
}

impl From<ConnectionClass> for u8 {
    fn from(c: ConnectionClass) -> Self {
        match c {
            ConnectionClass::I2c => 0x01,
            ConnectionClass::Spi => 0x02,
            ConnectionClass::Uart => 0x03,
            ConnectionClass::Gpio => 0x04,
            ConnectionClass::StemmaQt => 0x05,
            ConnectionClass::Builtin => 0x06,
            ConnectionClass::Other(v) => v,
        }
    }
}

/// Hardware provenance entry (e.g., `LIS3DH@0x18` on I2C)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareItem {
    pub class: HardwareClass,
    pub connection: ConnectionClass,
    pub identifier: String,
}

bitflags! {
    /// Reasons a block was committed
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FlushFlags: u8 {
        /// Periodic time threshold elapsed
        const TIME = 0x01;
        /// Payload reached the fill threshold
        const SIZE = 0x02;
        /// High g-force event
        const EVENT = 0x04;
        /// Explicit flush request
        const MANUAL = 0x08;
        /// Final block written on stop
        const SHUTDOWN = 0x10;
    }
}

impl FlushFlags {
    /// Flag names for display, e.g. `["SIZE", "EVENT"]`
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

/// Shared view of the file the session manager is currently writing
///
/// Written by the consumer on start/stop, read by retention on its own cadence.
#[derive(Debug, Clone, Default)]
pub struct ActiveSessionHandle(Arc<RwLock<Option<PathBuf>>>);

impl ActiveSessionHandle {
    /// Create an empty handle
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the active file path
    pub fn get(&self) -> Option<PathBuf> {
        match self.0.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the active file path
    pub fn set(&self, path: Option<PathBuf>) {
        match self.0.write() {
            Ok(mut guard) => *guard = path,
            Err(poisoned) => *poisoned.into_inner() = path,
        }
    }
}
