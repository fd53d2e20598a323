//! Bounded record writer
//!
//! Appends little-endian fields into a fixed-capacity buffer and fails with
//! `CapacityExceeded` instead of growing past it.

use bytes::{BufMut, Bytes, BytesMut};
use contracts::{truncate_utf8, MAX_BLOCK_SIZE};

use crate::consts::{RecordType, MAGIC};
use crate::error::{CodecError, Result};

/// Record writer bounded by `MAX_BLOCK_SIZE` (or a caller-supplied limit)
#[derive(Debug)]
pub struct RecordWriter {
    buf: BytesMut,
    limit: usize,
}

impl RecordWriter {
    /// Start a record: magic + type tag
    pub fn new(record: RecordType) -> Self {
        Self::with_limit(record, MAX_BLOCK_SIZE)
    }

    pub fn with_limit(record: RecordType, limit: usize) -> Self {
        let mut buf = BytesMut::with_capacity(limit.min(256));
        buf.put_slice(&MAGIC);
        buf.put_u8(record as u8);
        Self { buf, limit }
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes still available under the limit
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.buf.len())
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        let available = self.remaining();
        if needed > available {
            return Err(CodecError::CapacityExceeded { needed, available });
        }
        Ok(())
    }

    pub fn put_u8(&mut self, v: u8) -> Result<()> {
        self.ensure(1)?;
        self.buf.put_u8(v);
        Ok(())
    }

    pub fn put_u16(&mut self, v: u16) -> Result<()> {
        self.ensure(2)?;
        self.buf.put_u16_le(v);
        Ok(())
    }

    pub fn put_i16(&mut self, v: i16) -> Result<()> {
        self.ensure(2)?;
        self.buf.put_i16_le(v);
        Ok(())
    }

    pub fn put_u32(&mut self, v: u32) -> Result<()> {
        self.ensure(4)?;
        self.buf.put_u32_le(v);
        Ok(())
    }

    pub fn put_u64(&mut self, v: u64) -> Result<()> {
        self.ensure(8)?;
        self.buf.put_u64_le(v);
        Ok(())
    }

    pub fn put_slice(&mut self, data: &[u8]) -> Result<()> {
        self.ensure(data.len())?;
        self.buf.put_slice(data);
        Ok(())
    }

    /// Length-prefixed string, truncated to `max` bytes on a char boundary.
    ///
    /// Returns the number of string bytes written.
    pub fn put_str(&mut self, s: &str, max: usize) -> Result<usize> {
        let s = truncate_utf8(s, max.min(u8::MAX as usize));
        self.ensure(1 + s.len())?;
        self.buf.put_u8(s.len() as u8);
        self.buf.put_slice(s.as_bytes());
        Ok(s.len())
    }

    /// Append CRC-32 of everything written so far and return the record
    pub fn finish_with_crc(mut self) -> Result<Bytes> {
        let crc = crc32fast::hash(&self.buf);
        self.put_u32(crc)?;
        Ok(self.buf.freeze())
    }

    /// Return the record without a checksum
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}
