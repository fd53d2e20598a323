//! Wire constants

use contracts::MAX_DATA_PAYLOAD;

/// Record marker; also the resynchronization point after corruption
pub const MAGIC: [u8; 4] = *b"OPNY";

pub const FORMAT_VERSION_MAJOR: u8 = 2;
pub const FORMAT_VERSION_MINOR: u8 = 0;
pub const HARDWARE_VERSION_MAJOR: u8 = 1;
pub const HARDWARE_VERSION_MINOR: u8 = 0;

/// Record type tag following the magic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    SessionHeader = 0x01,
    Data = 0x02,
    SessionEnd = 0x03,
    HardwareConfig = 0x04,
}

impl RecordType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x01 => Some(Self::SessionHeader),
            0x02 => Some(Self::Data),
            0x03 => Some(Self::SessionEnd),
            0x04 => Some(Self::HardwareConfig),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionHeader => "session_header",
            Self::Data => "data",
            Self::SessionEnd => "session_end",
            Self::HardwareConfig => "hardware_config",
        }
    }
}

pub const SAMPLE_TYPE_ACCELEROMETER: u8 = 0x01;
pub const SAMPLE_TYPE_GPS_FIX: u8 = 0x02;
pub const SAMPLE_TYPE_GPS_SATELLITES: u8 = 0x03;
pub const SAMPLE_TYPE_GYROSCOPE: u8 = 0x04;
pub const SAMPLE_TYPE_MAGNETOMETER: u8 = 0x05;
pub const SAMPLE_TYPE_EVENT_MARKER: u8 = 0x20;

/// Bytes per satellite in a GPS satellites record: id, azimuth u16, elevation, snr
pub const SATELLITE_LEN: usize = 5;

/// Magic + record type
pub const RECORD_PREFIX_LEN: usize = 5;

/// Trailing CRC-32
pub const CRC_LEN: usize = 4;

/// Data block header: prefix, id, seq, start, end, flags, count, length
pub const DATA_BLOCK_HEADER_LEN: usize = RECORD_PREFIX_LEN + 16 + 4 + 8 + 8 + 1 + 2 + 2;

/// Session end record length
pub const SESSION_END_LEN: usize = RECORD_PREFIX_LEN + 16;

/// Payload occupancy at which a block is committed with the SIZE flag (90%)
pub const SIZE_FLUSH_THRESHOLD: usize = MAX_DATA_PAYLOAD * 9 / 10;

/// Per-sample record header: tag, offset_ms u16, length u8
pub const SAMPLE_HEADER_LEN: usize = 4;

/// Largest offset a sample record can express
pub const MAX_OFFSET_MS: u16 = u16::MAX;
