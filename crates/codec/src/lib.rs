//! # Codec
//!
//! `.opl` binary session format.
//!
//! Responsibilities:
//! - CRC-32 (IEEE, via `crc32fast`) over every checksummed record
//! - Encode/decode session header, hardware config, data block and session end records
//! - Per-sample TLV records inside a block payload
//! - Block accumulation with bounded payload capacity
//! - Resynchronizing reader that skips corrupt records
//!
//! ## Record layout
//!
//! Every record starts with the 4-byte magic `OPNY` followed by a 1-byte
//! record type. All integers are little-endian.
//!
//! ```text
//! header   : magic | 0x01 | fmt maj/min | hw maj/min | ts u64 | id[16] | name | driver | vehicle | weather u8 | temp i16 | cfg crc u32 | crc u32
//! hardware : magic | 0x04 | count u8 | (class u8 | conn u8 | len u8 | id)* | crc u32
//! data     : magic | 0x02 | id[16] | seq u32 | start u64 | end u64 | flags u8 | samples u16 | len u16 | payload | crc u32
//! end      : magic | 0x03 | id[16]
//! ```
//!
//! ## Usage Example
//!
//! ```ignore
//! use codec::{Block, SessionLog};
//!
//! let mut block = Block::new(session_id, 0);
//! if !block.try_append(&sample) {
//!     storage_file.write(&block.encode())?;
//!     block = block.next();
//! }
//!
//! let log = SessionLog::parse(&bytes);
//! for sample in log.samples() {
//!     // ...
//! }
//! ```

mod block;
mod consts;
mod error;
mod frame;
mod reader;
mod record;
mod writer;

pub use block::Block;
pub use consts::*;
pub use error::{CodecError, Result};
pub use frame::{
    append_sample_record, decode_record, encode_data_block, encode_hardware_block,
    encode_session_end, encode_session_header, DataBlock, Record, SessionHeader,
};
pub use reader::{BlockSummary, Corruption, FrameReader, ReadItem, SessionLog};
pub use record::{decode_payload, decode_samples, RecordBody, SampleRecord, TimedSample};
pub use writer::RecordWriter;
