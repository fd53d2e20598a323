//! Per-sample TLV records inside a data block payload
//!
//! `tag u8 | offset_ms u16 | len u8 | data[len]`, where `offset_ms` is the
//! sample time relative to the block start, saturating at `0xFFFF`.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use contracts::{
    truncate_utf8, GpsFix, Reading, Sample, Satellite, Vector3, MAX_MARKER_LEN, MAX_SATELLITES,
};
use serde::Serialize;

use crate::consts::*;
use crate::error::{CodecError, Result};
use crate::frame::DataBlock;

const VECTOR_LEN: usize = 12;
const GPS_LEN: usize = 32;

/// Encoded body length for a reading
pub(crate) fn body_len(reading: &Reading) -> usize {
    match reading {
        Reading::Gps(_) => GPS_LEN,
        Reading::Accel(_) | Reading::Gyro(_) | Reading::Magnetometer(_) => VECTOR_LEN,
        Reading::GpsSatellites { satellites } => {
            1 + satellites.len().min(MAX_SATELLITES) * SATELLITE_LEN
        }
        Reading::Marker { message } => truncate_utf8(message, MAX_MARKER_LEN).len(),
    }
}

/// Full record length (header + body)
pub(crate) fn record_len(reading: &Reading) -> usize {
    SAMPLE_HEADER_LEN + body_len(reading)
}

fn tag_of(reading: &Reading) -> u8 {
    match reading {
        Reading::Accel(_) => SAMPLE_TYPE_ACCELEROMETER,
        Reading::Gps(_) => SAMPLE_TYPE_GPS_FIX,
        Reading::Gyro(_) => SAMPLE_TYPE_GYROSCOPE,
        Reading::Magnetometer(_) => SAMPLE_TYPE_MAGNETOMETER,
        Reading::GpsSatellites { .. } => SAMPLE_TYPE_GPS_SATELLITES,
        Reading::Marker { .. } => SAMPLE_TYPE_EVENT_MARKER,
    }
}

/// Millisecond offset from block start, saturating at `MAX_OFFSET_MS`
pub(crate) fn offset_ms(block_start_us: u64, timestamp_us: u64) -> u16 {
    let delta_ms = timestamp_us.saturating_sub(block_start_us) / 1000;
    delta_ms.min(MAX_OFFSET_MS as u64) as u16
}

fn put_vector(buf: &mut BytesMut, v: &Vector3) {
    buf.put_f32_le(v.x);
    buf.put_f32_le(v.y);
    buf.put_f32_le(v.z);
}

/// Append one record; caller has already checked capacity
pub(crate) fn put_record(buf: &mut BytesMut, sample: &Sample, offset_ms: u16) {
    let reading = &sample.reading;
    buf.put_u8(tag_of(reading));
    buf.put_u16_le(offset_ms);
    buf.put_u8(body_len(reading) as u8);
    match reading {
        Reading::Accel(v) | Reading::Gyro(v) | Reading::Magnetometer(v) => put_vector(buf, v),
        Reading::Gps(fix) => {
            buf.put_f64_le(fix.latitude);
            buf.put_f64_le(fix.longitude);
            buf.put_f32_le(fix.altitude);
            buf.put_f32_le(fix.speed);
            buf.put_f32_le(fix.heading);
            buf.put_f32_le(fix.hdop);
        }
        Reading::GpsSatellites { satellites } => {
            let count = satellites.len().min(MAX_SATELLITES);
            buf.put_u8(count as u8);
            for sat in &satellites[..count] {
                buf.put_u8(sat.id);
                buf.put_u16_le(sat.azimuth);
                buf.put_u8(sat.elevation);
                buf.put_u8(sat.snr);
            }
        }
        Reading::Marker { message } => {
            buf.put_slice(truncate_utf8(message, MAX_MARKER_LEN).as_bytes());
        }
    }
}

/// Decoded record body
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordBody {
    Reading(Reading),
    /// Tag the reader does not understand, or a known tag with an unexpected length
    Unknown { tag: u8, data: Vec<u8> },
}

impl RecordBody {
    fn unknown(tag: u8, data: &[u8]) -> Self {
        RecordBody::Unknown {
            tag,
            data: data.to_vec(),
        }
    }
}

/// One decoded TLV record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRecord {
    pub offset_ms: u16,
    pub body: RecordBody,
}

impl SampleRecord {
    /// Absolute timestamp (millisecond resolution) given the block start
    pub fn timestamp_us(&self, block_start_us: u64) -> u64 {
        block_start_us + self.offset_ms as u64 * 1000
    }
}

/// Sample with its reconstructed absolute time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimedSample {
    pub timestamp_us: u64,
    pub sequence: u32,
    pub body: RecordBody,
}

fn get_vector(mut data: &[u8]) -> Vector3 {
    Vector3 {
        x: data.get_f32_le(),
        y: data.get_f32_le(),
        z: data.get_f32_le(),
    }
}

fn get_satellites(mut data: &[u8]) -> Vec<Satellite> {
    let count = data.get_u8() as usize;
    (0..count)
        .map(|_| Satellite {
            id: data.get_u8(),
            azimuth: data.get_u16_le(),
            elevation: data.get_u8(),
            snr: data.get_u8(),
        })
        .collect()
}

fn decode_body(tag: u8, data: &[u8]) -> RecordBody {
    match (tag, data.len()) {
        (SAMPLE_TYPE_ACCELEROMETER, VECTOR_LEN) => RecordBody::Reading(Reading::Accel(get_vector(data))),
        (SAMPLE_TYPE_GYROSCOPE, VECTOR_LEN) => RecordBody::Reading(Reading::Gyro(get_vector(data))),
        (SAMPLE_TYPE_MAGNETOMETER, VECTOR_LEN) => {
            RecordBody::Reading(Reading::Magnetometer(get_vector(data)))
        }
        (SAMPLE_TYPE_GPS_FIX, GPS_LEN) => {
            let mut d = data;
            RecordBody::Reading(Reading::Gps(GpsFix {
                latitude: d.get_f64_le(),
                longitude: d.get_f64_le(),
                altitude: d.get_f32_le(),
                speed: d.get_f32_le(),
                heading: d.get_f32_le(),
                hdop: d.get_f32_le(),
            }))
        }
        (SAMPLE_TYPE_GPS_SATELLITES, len)
            if len > 0 && len == 1 + data[0] as usize * SATELLITE_LEN =>
        {
            RecordBody::Reading(Reading::GpsSatellites {
                satellites: get_satellites(data),
            })
        }
        (SAMPLE_TYPE_EVENT_MARKER, _) => match std::str::from_utf8(data) {
            Ok(message) => RecordBody::Reading(Reading::Marker {
                message: message.to_string(),
            }),
            Err(_) => RecordBody::unknown(tag, data),
        },
        _ => RecordBody::unknown(tag, data),
    }
}

/// Walk a block payload into records.
///
/// Unknown tags are skipped over by their length byte and surfaced as
/// `RecordBody::Unknown`.
pub fn decode_payload(payload: &[u8]) -> Result<Vec<SampleRecord>> {
    let mut records = Vec::new();
    let mut buf = Bytes::copy_from_slice(payload);
    while buf.has_remaining() {
        if buf.remaining() < SAMPLE_HEADER_LEN {
            return Err(CodecError::Truncated {
                needed: SAMPLE_HEADER_LEN,
                available: buf.remaining(),
            });
        }
        let tag = buf.get_u8();
        let offset_ms = buf.get_u16_le();
        let len = buf.get_u8() as usize;
        if buf.remaining() < len {
            return Err(CodecError::Truncated {
                needed: len,
                available: buf.remaining(),
            });
        }
        let data = buf.split_to(len);
        records.push(SampleRecord {
            offset_ms,
            body: decode_body(tag, &data),
        });
    }
    Ok(records)
}

/// Expand a decoded data block into samples with absolute timestamps
pub fn decode_samples(block: &DataBlock) -> Result<Vec<TimedSample>> {
    Ok(decode_payload(&block.payload)?
        .into_iter()
        .map(|r| TimedSample {
            timestamp_us: r.timestamp_us(block.start_us),
            sequence: block.sequence,
            body: r.body,
        })
        .collect())
}
