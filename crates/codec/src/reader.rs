//! Resynchronizing session file reader
//!
//! Corrupt or truncated records are reported and skipped; the reader scans
//! forward to the next `OPNY` marker and carries on.

use contracts::{HardwareItem, SessionId};
use serde::Serialize;
use tracing::debug;

use crate::consts::MAGIC;
use crate::error::CodecError;
use crate::frame::{decode_record, DataBlock, Record, SessionHeader};
use crate::record::{decode_samples, TimedSample};

/// Skipped region of a session file
#[derive(Debug, Clone, PartialEq)]
pub struct Corruption {
    /// Byte offset where the bad region starts
    pub offset: usize,
    /// Bytes skipped before the next record (or end of file)
    pub skipped: usize,
    pub error: CodecError,
}

/// Reader output
#[derive(Debug, Clone, PartialEq)]
pub enum ReadItem {
    Record { offset: usize, record: Record },
    Corrupt(Corruption),
}

/// Iterator over the records of a session file
#[derive(Debug)]
pub struct FrameReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Next magic at or after `from`, or end of data
    fn find_magic(&self, from: usize) -> usize {
        self.data[from.min(self.data.len())..]
            .windows(MAGIC.len())
            .position(|w| w == MAGIC)
            .map(|i| from + i)
            .unwrap_or(self.data.len())
    }
}

impl Iterator for FrameReader<'_> {
    type Item = ReadItem;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }

        let start = self.pos;
        match decode_record(&self.data[start..]) {
            Ok((record, used)) => {
                self.pos = start + used;
                Some(ReadItem::Record {
                    offset: start,
                    record,
                })
            }
            Err(error) => {
                let resume = self.find_magic(start + 1);
                self.pos = resume;
                debug!(
                    offset = start,
                    skipped = resume - start,
                    error = %error,
                    "Skipping corrupt region"
                );
                Some(ReadItem::Corrupt(Corruption {
                    offset: start,
                    skipped: resume - start,
                    error,
                }))
            }
        }
    }
}

/// Parsed session file
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    pub header: Option<SessionHeader>,
    pub hardware: Vec<HardwareItem>,
    pub blocks: Vec<DataBlock>,
    pub end: Option<SessionId>,
    pub corruptions: Vec<Corruption>,
}

impl SessionLog {
    /// Parse a whole file, collecting every valid record
    pub fn parse(data: &[u8]) -> Self {
        let mut log = SessionLog::default();
        for item in FrameReader::new(data) {
            match item {
                ReadItem::Record { record, .. } => match record {
                    Record::SessionHeader(h) => {
                        if log.header.is_none() {
                            log.header = Some(h);
                        }
                    }
                    Record::HardwareConfig(items) => log.hardware = items,
                    Record::Data(block) => log.blocks.push(block),
                    Record::SessionEnd(id) => log.end = Some(id),
                },
                ReadItem::Corrupt(c) => log.corruptions.push(c),
            }
        }
        log
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.header.as_ref().map(|h| h.session_id)
    }

    /// Header present and end marker matches it
    pub fn is_complete(&self) -> bool {
        match (&self.header, self.end) {
            (Some(h), Some(end)) => h.session_id == end,
            _ => false,
        }
    }

    /// Sum of per-block sample counts
    pub fn sample_count(&self) -> usize {
        self.blocks.iter().map(|b| b.sample_count as usize).sum()
    }

    /// Decode every block payload into samples with absolute timestamps.
    ///
    /// Blocks whose payload does not parse are skipped.
    pub fn samples(&self) -> Vec<TimedSample> {
        let mut out = Vec::with_capacity(self.sample_count());
        for block in &self.blocks {
            match decode_samples(block) {
                Ok(samples) => out.extend(samples),
                Err(e) => {
                    debug!(sequence = block.sequence, error = %e, "Undecodable payload");
                }
            }
        }
        out
    }

    /// Inclusive `(first, last)` ranges of sequence numbers missing between
    /// the first and last block
    pub fn sequence_gaps(&self) -> Vec<(u32, u32)> {
        let mut seqs: Vec<u32> = self.blocks.iter().map(|b| b.sequence).collect();
        seqs.sort_unstable();
        seqs.dedup();
        seqs.windows(2)
            .filter(|pair| pair[1] - pair[0] > 1)
            .map(|pair| (pair[0] + 1, pair[1] - 1))
            .collect()
    }

    /// Total number of blocks covered by `sequence_gaps`
    pub fn missing_blocks(&self) -> u64 {
        self.sequence_gaps()
            .iter()
            .map(|&(first, last)| (last - first) as u64 + 1)
            .sum()
    }
}

/// Block summary for reports
#[derive(Debug, Clone, Serialize)]
pub struct BlockSummary {
    pub sequence: u32,
    pub samples: u16,
    pub span_ms: u64,
    pub flags: Vec<&'static str>,
}

impl From<&DataBlock> for BlockSummary {
    fn from(b: &DataBlock) -> Self {
        Self {
            sequence: b.sequence,
            samples: b.sample_count,
            span_ms: b.end_us.saturating_sub(b.start_us) / 1000,
            flags: b.flags.names(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::frame::{encode_data_block, encode_session_end, encode_session_header};
    use crate::record::RecordBody;
    use contracts::{FlushFlags, Reading, Sample, SessionMetadata};

    fn build_file(id: SessionId, blocks: u32) -> Vec<u8> {
        let meta = SessionMetadata {
            name: "test".into(),
            ..Default::default()
        };
        let mut out = encode_session_header(id, &meta, 1).unwrap().to_vec();
        for seq in 0..blocks {
            let mut block = Block::new(id, seq);
            for i in 0..3u64 {
                block.try_append(&Sample::accel(0.0, 0.0, 1.0, 1_000_000 * seq as u64 + i * 10_000));
            }
            block.mark(FlushFlags::TIME);
            out.extend_from_slice(&encode_data_block(&block));
        }
        out.extend_from_slice(&encode_session_end(id));
        out
    }

    #[test]
    fn test_parse_complete_file() {
        let id = SessionId::from_clock(123);
        let log = SessionLog::parse(&build_file(id, 3));
        assert!(log.is_complete());
        assert_eq!(log.blocks.len(), 3);
        assert_eq!(log.sample_count(), 9);
        assert!(log.corruptions.is_empty());
        assert!(log.sequence_gaps().is_empty());

        let samples = log.samples();
        assert_eq!(samples.len(), 9);
        assert_eq!(samples[4].timestamp_us, 1_010_000);
        assert!(matches!(samples[0].body, RecordBody::Reading(Reading::Accel(_))));
    }

    #[test]
    fn test_resync_after_corrupt_block() {
        let id = SessionId::from_clock(456);
        let mut data = build_file(id, 3);
        // corrupt the payload of the second block
        let offsets: Vec<usize> = FrameReader::new(&data)
            .filter_map(|item| match item {
                ReadItem::Record {
                    offset,
                    record: Record::Data(_),
                } => Some(offset),
                _ => None,
            })
            .collect();
        data[offsets[1] + 50] ^= 0x80;

        let log = SessionLog::parse(&data);
        assert_eq!(log.blocks.len(), 2);
        assert_eq!(log.corruptions.len(), 1);
        assert!(matches!(
            log.corruptions[0].error,
            CodecError::ChecksumMismatch { .. }
        ));
        assert_eq!(log.sequence_gaps(), vec![(1, 1)]);
        assert_eq!(log.missing_blocks(), 1);
        assert!(log.is_complete());
    }

    #[test]
    fn test_sequence_gaps_are_ranges() {
        let id = SessionId::from_clock(5);
        let mut log = SessionLog::default();
        for seq in [0, 1, 4, 9, u32::MAX] {
            let mut block = Block::new(id, seq);
            block.try_append(&Sample::accel(0.0, 0.0, 1.0, 1));
            let bytes = encode_data_block(&block);
            let (Record::Data(data), _) = decode_record(&bytes).unwrap() else {
                panic!("expected data block");
            };
            log.blocks.push(data);
        }
        assert_eq!(log.sequence_gaps(), vec![(2, 3), (5, 8), (10, u32::MAX - 1)]);
        assert_eq!(log.missing_blocks(), 2 + 4 + (u32::MAX as u64 - 10));
    }

    #[test]
    fn test_truncated_tail() {
        let id = SessionId::from_clock(789);
        let data = build_file(id, 2);
        // power loss mid-write: drop the end marker and half a block
        let cut = data.len() - 21 - 30;
        let log = SessionLog::parse(&data[..cut]);
        assert_eq!(log.blocks.len(), 1);
        assert!(!log.is_complete());
        assert_eq!(log.corruptions.len(), 1);
        assert!(matches!(
            log.corruptions[0].error,
            CodecError::Truncated { .. }
        ));
    }

    #[test]
    fn test_leading_garbage_skipped() {
        let id = SessionId::from_clock(1);
        let mut data = vec![0xFFu8; 7];
        data.extend(build_file(id, 1));
        let log = SessionLog::parse(&data);
        assert_eq!(log.corruptions[0].skipped, 7);
        assert_eq!(log.blocks.len(), 1);
    }

    #[test]
    fn test_block_summary() {
        let id = SessionId::from_clock(5);
        let log = SessionLog::parse(&build_file(id, 1));
        let summary = BlockSummary::from(&log.blocks[0]);
        assert_eq!(summary.samples, 3);
        assert_eq!(summary.span_ms, 20);
        assert_eq!(summary.flags, vec!["TIME"]);
    }
}
