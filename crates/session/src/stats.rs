//! Session manager counters

use serde::Serialize;

/// Cumulative counters across all sessions of one manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub sessions_started: u64,
    pub blocks_written: u64,
    pub blocks_failed: u64,
    pub bytes_written: u64,
    pub samples_written: u64,
    /// Samples in blocks whose write failed
    pub samples_lost: u64,
    /// Samples that did not fit even an empty block
    pub samples_dropped: u64,
    pub event_flushes: u64,
    pub size_flushes: u64,
    pub time_flushes: u64,
    pub overflow_flushes: u64,
}

impl SessionStats {
    /// Fraction of committed blocks that failed to write
    pub fn failure_rate(&self) -> f64 {
        let total = self.blocks_written + self.blocks_failed;
        if total == 0 {
            0.0
        } else {
            self.blocks_failed as f64 / total as f64
        }
    }
}
