//! Record encode/decode

use bytes::{Buf, BufMut, Bytes, BytesMut};
use crc32fast::Hasher as Crc32;
use contracts::{
    ConnectionClass, FlushFlags, HardwareClass, HardwareItem, Sample, SessionId, SessionMetadata,
    MAX_DATA_PAYLOAD, MAX_DRIVER_NAME, MAX_HARDWARE_ID, MAX_HARDWARE_ITEMS, MAX_SESSION_NAME,
    MAX_VEHICLE_ID,
};
use serde::Serialize;

use crate::block::Block;
use crate::consts::*;
use crate::error::{CodecError, Result};
use crate::writer::RecordWriter;

/// Decoded session header
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionHeader {
    pub format_version: (u8, u8),
    pub hardware_version: (u8, u8),
    /// Clock time the header was written (µs)
    pub written_at_us: u64,
    pub session_id: SessionId,
    pub metadata: SessionMetadata,
}

/// Decoded data block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataBlock {
    pub session_id: SessionId,
    pub sequence: u32,
    pub start_us: u64,
    pub end_us: u64,
    #[serde(serialize_with = "serialize_flags")]
    pub flags: FlushFlags,
    pub sample_count: u16,
    #[serde(skip)]
    pub payload: Bytes,
}

fn serialize_flags<S: serde::Serializer>(
    flags: &FlushFlags,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(flags.names())
}

/// One framed record
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    SessionHeader(SessionHeader),
    HardwareConfig(Vec<HardwareItem>),
    Data(DataBlock),
    SessionEnd(SessionId),
}

impl Record {
    pub fn record_type(&self) -> RecordType {
        match self {
            Record::SessionHeader(_) => RecordType::SessionHeader,
            Record::HardwareConfig(_) => RecordType::HardwareConfig,
            Record::Data(_) => RecordType::Data,
            Record::SessionEnd(_) => RecordType::SessionEnd,
        }
    }
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encode a session header record.
///
/// Strings are truncated to their field maxima; temperature is stored as
/// tenths of a degree.
pub fn encode_session_header(
    session_id: SessionId,
    metadata: &SessionMetadata,
    written_at_us: u64,
) -> Result<Bytes> {
    let mut w = RecordWriter::new(RecordType::SessionHeader);
    w.put_u8(FORMAT_VERSION_MAJOR)?;
    w.put_u8(FORMAT_VERSION_MINOR)?;
    w.put_u8(HARDWARE_VERSION_MAJOR)?;
    w.put_u8(HARDWARE_VERSION_MINOR)?;
    w.put_u64(written_at_us)?;
    w.put_slice(&session_id.to_bytes())?;
    w.put_str(&metadata.name, MAX_SESSION_NAME)?;
    w.put_str(&metadata.driver, MAX_DRIVER_NAME)?;
    w.put_str(&metadata.vehicle, MAX_VEHICLE_ID)?;
    w.put_u8(metadata.weather)?;
    w.put_i16(encode_temperature(metadata.ambient_temp_c))?;
    w.put_u32(metadata.config_crc)?;
    w.finish_with_crc()
}

fn encode_temperature(celsius: f32) -> i16 {
    // `as` saturates out-of-range and maps NaN to 0
    (celsius * 10.0).round() as i16
}

/// Encode the hardware provenance record (at most `MAX_HARDWARE_ITEMS`).
///
/// No items encodes to nothing.
pub fn encode_hardware_block(items: &[HardwareItem]) -> Result<Bytes> {
    if items.is_empty() {
        return Ok(Bytes::new());
    }
    let items = &items[..items.len().min(MAX_HARDWARE_ITEMS)];
    let mut w = RecordWriter::new(RecordType::HardwareConfig);
    w.put_u8(items.len() as u8)?;
    for item in items {
        w.put_u8(item.class.into())?;
        w.put_u8(item.connection.into())?;
        w.put_str(&item.identifier, MAX_HARDWARE_ID)?;
    }
    w.finish_with_crc()
}

/// Encode a data block record. CRC covers header and payload.
///
/// An empty block encodes to nothing.
pub fn encode_data_block(block: &Block) -> Bytes {
    if block.is_empty() {
        return Bytes::new();
    }
    let payload = block.payload();
    let mut buf = BytesMut::with_capacity(DATA_BLOCK_HEADER_LEN + payload.len() + CRC_LEN);
    buf.put_slice(&MAGIC);
    buf.put_u8(RecordType::Data as u8);
    buf.put_slice(&block.session_id().to_bytes());
    buf.put_u32_le(block.sequence());
    buf.put_u64_le(block.start_us());
    buf.put_u64_le(block.end_us());
    buf.put_u8(block.flags().bits());
    buf.put_u16_le(block.sample_count());
    buf.put_u16_le(payload.len() as u16);

    let mut hasher = Crc32::new();
    hasher.update(&buf);
    hasher.update(payload);
    buf.put_slice(payload);
    buf.put_u32_le(hasher.finalize());
    buf.freeze()
}

/// Encode the session end marker (no checksum)
pub fn encode_session_end(session_id: SessionId) -> Bytes {
    let mut buf = BytesMut::with_capacity(SESSION_END_LEN);
    buf.put_slice(&MAGIC);
    buf.put_u8(RecordType::SessionEnd as u8);
    buf.put_slice(&session_id.to_bytes());
    buf.freeze()
}

/// Append a sample to a block; `false` when it does not fit
pub fn append_sample_record(block: &mut Block, sample: &Sample) -> bool {
    block.try_append(sample)
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Checked little-endian field reader over a record slice
struct Fields<'a> {
    buf: &'a [u8],
}

impl<'a> Fields<'a> {
    fn need(&self, n: usize) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(CodecError::Truncated {
                needed: n,
                available: self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn u8(&mut self) -> Result<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn u16(&mut self) -> Result<u16> {
        self.need(2)?;
        Ok(self.buf.get_u16_le())
    }

    fn i16(&mut self) -> Result<i16> {
        self.need(2)?;
        Ok(self.buf.get_i16_le())
    }

    fn u32(&mut self) -> Result<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    fn u64(&mut self) -> Result<u64> {
        self.need(8)?;
        Ok(self.buf.get_u64_le())
    }

    fn slice(&mut self, n: usize) -> Result<&'a [u8]> {
        self.need(n)?;
        let buf: &'a [u8] = self.buf;
        let (head, tail) = buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn session_id(&mut self) -> Result<SessionId> {
        let mut id = [0u8; 16];
        id.copy_from_slice(self.slice(16)?);
        Ok(SessionId::from_bytes(id))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u8()? as usize;
        Ok(String::from_utf8_lossy(self.slice(len)?).into_owned())
    }
}

/// Verify the CRC stored right after `body_len` bytes of `buf`
fn verify_crc(buf: &[u8], body_len: usize, record: RecordType) -> Result<()> {
    let mut fields = Fields {
        buf: &buf[body_len..],
    };
    let stored = fields.u32()?;
    let computed = crc32fast::hash(&buf[..body_len]);
    if stored != computed {
        return Err(CodecError::ChecksumMismatch {
            record: record.name(),
            stored,
            computed,
        });
    }
    Ok(())
}

/// Decode the record at the start of `buf`.
///
/// Returns the record and the number of bytes it occupied.
pub fn decode_record(buf: &[u8]) -> Result<(Record, usize)> {
    if buf.len() < RECORD_PREFIX_LEN {
        return Err(CodecError::Truncated {
            needed: RECORD_PREFIX_LEN,
            available: buf.len(),
        });
    }
    if buf[..4] != MAGIC {
        let mut found = [0u8; 4];
        found.copy_from_slice(&buf[..4]);
        return Err(CodecError::BadMagic { found });
    }
    let record_type =
        RecordType::from_u8(buf[4]).ok_or(CodecError::UnknownRecordType(buf[4]))?;
    let mut fields = Fields {
        buf: &buf[RECORD_PREFIX_LEN..],
    };

    match record_type {
        RecordType::SessionHeader => {
            let format_version = (fields.u8()?, fields.u8()?);
            let hardware_version = (fields.u8()?, fields.u8()?);
            let written_at_us = fields.u64()?;
            let session_id = fields.session_id()?;
            let name = fields.string()?;
            let driver = fields.string()?;
            let vehicle = fields.string()?;
            let weather = fields.u8()?;
            let temp = fields.i16()?;
            let config_crc = fields.u32()?;

            let body_len = buf.len() - fields.buf.len();
            verify_crc(buf, body_len, record_type)?;
            let header = SessionHeader {
                format_version,
                hardware_version,
                written_at_us,
                session_id,
                metadata: SessionMetadata {
                    name,
                    driver,
                    vehicle,
                    weather,
                    ambient_temp_c: temp as f32 / 10.0,
                    config_crc,
                },
            };
            Ok((Record::SessionHeader(header), body_len + CRC_LEN))
        }
        RecordType::HardwareConfig => {
            let count = fields.u8()?;
            let mut items = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let class = HardwareClass::from(fields.u8()?);
                let connection = ConnectionClass::from(fields.u8()?);
                let identifier = fields.string()?;
                items.push(HardwareItem {
                    class,
                    connection,
                    identifier,
                });
            }
            let body_len = buf.len() - fields.buf.len();
            verify_crc(buf, body_len, record_type)?;
            Ok((Record::HardwareConfig(items), body_len + CRC_LEN))
        }
        RecordType::Data => {
            let session_id = fields.session_id()?;
            let sequence = fields.u32()?;
            let start_us = fields.u64()?;
            let end_us = fields.u64()?;
            let flags = FlushFlags::from_bits_retain(fields.u8()?);
            let sample_count = fields.u16()?;
            let payload_len = fields.u16()? as usize;
            if payload_len > MAX_DATA_PAYLOAD {
                return Err(CodecError::Malformed {
                    record: record_type.name(),
                    message: format!("payload length {} exceeds {}", payload_len, MAX_DATA_PAYLOAD),
                });
            }
            let payload = fields.slice(payload_len)?;

            let body_len = DATA_BLOCK_HEADER_LEN + payload_len;
            verify_crc(buf, body_len, record_type)?;
            let block = DataBlock {
                session_id,
                sequence,
                start_us,
                end_us,
                flags,
                sample_count,
                payload: Bytes::copy_from_slice(payload),
            };
            Ok((Record::Data(block), body_len + CRC_LEN))
        }
        RecordType::SessionEnd => {
            let session_id = fields.session_id()?;
            Ok((Record::SessionEnd(session_id), SESSION_END_LEN))
        }
    }
}
