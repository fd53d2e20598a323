//! Format-defined maxima shared by the codec and the session manager.

/// Maximum encoded size of one data block record
pub const MAX_BLOCK_SIZE: usize = 4096;

/// Payload capacity of a data block (block size minus header/footer reserve)
pub const MAX_DATA_PAYLOAD: usize = MAX_BLOCK_SIZE - 80;

/// Maximum session name length in bytes
pub const MAX_SESSION_NAME: usize = 64;

/// Maximum driver/operator name length in bytes
pub const MAX_DRIVER_NAME: usize = 32;

/// Maximum vehicle/asset identifier length in bytes
pub const MAX_VEHICLE_ID: usize = 24;

/// Maximum number of hardware provenance entries per session
pub const MAX_HARDWARE_ITEMS: usize = 32;

/// Maximum hardware identifier length in bytes
pub const MAX_HARDWARE_ID: usize = 31;

/// Satellites per GPS satellites record (count byte + 5 bytes each within the u8 length)
pub const MAX_SATELLITES: usize = 50;

/// Marker message length in bytes (u8 record length)
pub const MAX_MARKER_LEN: usize = 255;

/// Default sample queue slot count
pub const DEFAULT_QUEUE_CAPACITY: usize = 2048;

/// Truncate `s` to at most `max` bytes without splitting a UTF-8 character.
pub fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_utf8("abcdef", 3), "abc");
        assert_eq!(truncate_utf8("abc", 10), "abc");
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // "é" is two bytes; cutting at 2 would split it
        assert_eq!(truncate_utf8("aé", 2), "a");
        assert_eq!(truncate_utf8("aé", 3), "aé");
    }
}
