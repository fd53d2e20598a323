//! Codec error types

use thiserror::Error;

/// Encode/decode errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Buffer ended before the record did
    #[error("truncated record: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// Record does not start with the magic marker
    #[error("bad magic {found:02x?}")]
    BadMagic { found: [u8; 4] },

    /// Record type tag not recognized
    #[error("unknown record type {0:#04x}")]
    UnknownRecordType(u8),

    /// Stored and recomputed CRC disagree
    #[error("{record} checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        record: &'static str,
        stored: u32,
        computed: u32,
    },

    /// Bounded writer would overflow
    #[error("capacity exceeded: needed {needed} bytes, {available} available")]
    CapacityExceeded { needed: usize, available: usize },

    /// Structurally invalid field
    #[error("malformed {record}: {message}")]
    Malformed {
        record: &'static str,
        message: String,
    },
}

/// Codec Result alias
pub type Result<T> = std::result::Result<T, CodecError>;
