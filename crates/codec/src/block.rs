//! Block accumulator
//!
//! Collects sample records for one data block. The payload is bounded by
//! the block capacity (at most `MAX_DATA_PAYLOAD`); `try_append` refuses a
//! sample that does not fit and leaves the block unchanged.

use bytes::{Bytes, BytesMut};
use contracts::{FlushFlags, Sample, SessionId, MAX_DATA_PAYLOAD};

use crate::frame::encode_data_block;
use crate::record::{offset_ms, put_record, record_len};

/// In-progress data block
#[derive(Debug, Clone)]
pub struct Block {
    session_id: SessionId,
    sequence: u32,
    start_us: Option<u64>,
    end_us: u64,
    flags: FlushFlags,
    sample_count: u16,
    capacity: usize,
    payload: BytesMut,
}

impl Block {
    /// Empty block with the given sequence number and full payload capacity
    pub fn new(session_id: SessionId, sequence: u32) -> Self {
        Self::with_capacity(session_id, sequence, MAX_DATA_PAYLOAD)
    }

    /// Empty block holding at most `capacity` payload bytes (clamped to `MAX_DATA_PAYLOAD`)
    pub fn with_capacity(session_id: SessionId, sequence: u32, capacity: usize) -> Self {
        let capacity = capacity.min(MAX_DATA_PAYLOAD);
        Self {
            session_id,
            sequence,
            start_us: None,
            end_us: 0,
            flags: FlushFlags::empty(),
            sample_count: 0,
            capacity,
            payload: BytesMut::with_capacity(capacity),
        }
    }

    /// Empty successor block (sequence + 1, same capacity)
    pub fn next(&self) -> Self {
        Self::with_capacity(self.session_id, self.sequence.wrapping_add(1), self.capacity)
    }

    /// Append a sample record.
    ///
    /// The first sample fixes the block start time. Returns `false` when the
    /// record would overflow the payload.
    pub fn try_append(&mut self, sample: &Sample) -> bool {
        let len = record_len(&sample.reading);
        if self.payload.len() + len > self.capacity || self.sample_count == u16::MAX {
            return false;
        }

        let start = *self.start_us.get_or_insert(sample.timestamp_us);
        put_record(&mut self.payload, sample, offset_ms(start, sample.timestamp_us));
        self.end_us = self.end_us.max(sample.timestamp_us);
        self.sample_count += 1;
        true
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Timestamp of the first sample (0 when empty)
    pub fn start_us(&self) -> u64 {
        self.start_us.unwrap_or(0)
    }

    /// Latest sample timestamp (0 when empty)
    pub fn end_us(&self) -> u64 {
        self.end_us
    }

    pub fn sample_count(&self) -> u16 {
        self.sample_count
    }

    pub fn flags(&self) -> FlushFlags {
        self.flags
    }

    /// OR flush reasons into the block
    pub fn mark(&mut self, flags: FlushFlags) {
        self.flags |= flags;
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Payload fill fraction in `[0, 1]`
    pub fn occupancy(&self) -> f64 {
        if self.capacity == 0 {
            return 1.0;
        }
        self.payload.len() as f64 / self.capacity as f64
    }

    /// Payload has reached 90% of capacity (`SIZE_FLUSH_THRESHOLD` at full capacity)
    pub fn size_threshold_reached(&self) -> bool {
        self.payload.len() >= self.capacity * 9 / 10
    }

    /// Encode as a framed data block record
    pub fn encode(&self) -> Bytes {
        encode_data_block(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::GpsFix;

    fn id() -> SessionId {
        SessionId::from_clock(42)
    }

    #[test]
    fn test_first_sample_sets_start() {
        let mut block = Block::new(id(), 0);
        assert!(block.is_empty());
        assert!(block.try_append(&Sample::accel(0.0, 0.0, 1.0, 5_000)));
        assert!(block.try_append(&Sample::accel(0.0, 0.0, 1.0, 9_000)));
        assert_eq!(block.start_us(), 5_000);
        assert_eq!(block.end_us(), 9_000);
        assert_eq!(block.sample_count(), 2);
        assert_eq!(block.payload_len(), 32);
    }

    #[test]
    fn test_full_block_rejects_and_is_unchanged() {
        let mut block = Block::new(id(), 3);
        // 4016 / 16 = 251 accel records fit exactly
        for i in 0..251u64 {
            assert!(block.try_append(&Sample::accel(0.0, 0.0, 1.0, i * 1_000)));
        }
        assert_eq!(block.payload_len(), MAX_DATA_PAYLOAD);
        assert!(block.size_threshold_reached());

        let before = block.payload_len();
        assert!(!block.try_append(&Sample::accel(0.0, 0.0, 1.0, 999_000)));
        assert!(!block.try_append(&Sample::gps(GpsFix::default(), 999_000)));
        assert_eq!(block.payload_len(), before);
        assert_eq!(block.sample_count(), 251);
    }

    #[test]
    fn test_size_threshold() {
        let mut block = Block::new(id(), 0);
        // 3614 bytes = 225 full accel records (3600) is just below
        for i in 0..225u64 {
            block.try_append(&Sample::accel(0.0, 0.0, 1.0, i));
        }
        assert!(!block.size_threshold_reached());
        assert!(block.payload_len() < crate::consts::SIZE_FLUSH_THRESHOLD);
        block.try_append(&Sample::accel(0.0, 0.0, 1.0, 226));
        assert!(block.size_threshold_reached());
        assert!(block.occupancy() > 0.9);
    }

    #[test]
    fn test_small_capacity_carries_to_next() {
        let mut block = Block::with_capacity(id(), 0, 40);
        assert!(block.try_append(&Sample::accel(0.0, 0.0, 1.0, 1)));
        assert!(block.try_append(&Sample::accel(0.0, 0.0, 1.0, 2)));
        assert!(!block.try_append(&Sample::accel(0.0, 0.0, 1.0, 3)));
        assert!(!block.size_threshold_reached());

        let next = block.next();
        assert_eq!(next.capacity(), 40);
        let mut tiny = Block::with_capacity(id(), 0, 20);
        assert!(!tiny.try_append(&Sample::gps(GpsFix::default(), 1)));
        assert!(tiny.is_empty());

        assert_eq!(Block::with_capacity(id(), 0, 1 << 20).capacity(), MAX_DATA_PAYLOAD);
    }

    #[test]
    fn test_next_increments_sequence() {
        let mut block = Block::new(id(), 7);
        block.try_append(&Sample::accel(0.0, 0.0, 1.0, 1));
        block.mark(FlushFlags::TIME);
        let next = block.next();
        assert_eq!(next.sequence(), 8);
        assert!(next.is_empty());
        assert!(next.flags().is_empty());
    }
}
