//! DeflateStorage - compress each write call
//!
//! Every `write` becomes one frame:
//! `uncompressed_len: u32 LE | compressed_len: u32 LE | zlib data`.
//! Records are written whole, so a frame never splits a record.

use std::io::{Read, Write};
use std::path::Path;

use contracts::{ContractError, DirEntry, Storage, StorageFile, StorageUsage};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::warn;

const FRAME_HEADER_LEN: usize = 8;

/// Decorator that deflates bytes before handing them to the inner backend
#[derive(Debug, Clone)]
pub struct DeflateStorage<S> {
    inner: S,
    level: Compression,
}

impl<S: Storage> DeflateStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            level: Compression::default(),
        }
    }

    pub fn with_level(inner: S, level: u32) -> Self {
        Self {
            inner,
            level: Compression::new(level.min(9)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Storage> Storage for DeflateStorage<S> {
    type File = DeflateFile<S::File>;

    fn create(&self, path: &Path) -> Result<Self::File, ContractError> {
        Ok(DeflateFile {
            inner: self.inner.create(path)?,
            level: self.level,
            path: path.display().to_string(),
        })
    }

    fn list_directory(&self, path: &Path) -> Result<Vec<DirEntry>, ContractError> {
        self.inner.list_directory(path)
    }

    fn delete(&self, path: &Path) -> Result<(), ContractError> {
        self.inner.delete(path)
    }

    fn usage(&self) -> Result<StorageUsage, ContractError> {
        self.inner.usage()
    }

    /// Inflated file contents
    fn read(&self, path: &Path) -> Result<Vec<u8>, ContractError> {
        Ok(inflate_frames(&self.inner.read(path)?))
    }
}

/// Open compressed file
#[derive(Debug)]
pub struct DeflateFile<F> {
    inner: F,
    level: Compression,
    path: String,
}

impl<F: StorageFile> DeflateFile<F> {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>, ContractError> {
        let mut encoder = ZlibEncoder::new(Vec::new(), self.level);
        encoder
            .write_all(bytes)
            .and_then(|_| encoder.finish())
            .map_err(|e| ContractError::storage_write(&self.path, format!("deflate: {}", e)))
    }
}

impl<F: StorageFile> StorageFile for DeflateFile<F> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), ContractError> {
        if bytes.is_empty() {
            return Ok(());
        }
        let compressed = self.compress(bytes)?;
        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + compressed.len());
        frame.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        frame.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        frame.extend_from_slice(&compressed);
        self.inner.write(&frame)
    }

    fn sync(&mut self) -> Result<(), ContractError> {
        self.inner.sync()
    }

    fn close(self) -> Result<(), ContractError> {
        self.inner.close()
    }
}

/// Reverse [`DeflateStorage`] framing.
///
/// Decoding stops at the first truncated or undecodable frame; everything
/// before it is returned.
pub fn inflate_frames(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut rest = data;

    while !rest.is_empty() {
        if rest.len() < FRAME_HEADER_LEN {
            warn!(remaining = rest.len(), "Truncated compression frame header");
            break;
        }
        let raw_len = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        let packed_len = u32::from_le_bytes([rest[4], rest[5], rest[6], rest[7]]) as usize;
        let body = &rest[FRAME_HEADER_LEN..];
        if body.len() < packed_len {
            warn!(needed = packed_len, available = body.len(), "Truncated compression frame");
            break;
        }

        let mut decoded = Vec::with_capacity(raw_len);
        match ZlibDecoder::new(&body[..packed_len]).read_to_end(&mut decoded) {
            Ok(_) if decoded.len() == raw_len => out.extend_from_slice(&decoded),
            Ok(_) => {
                warn!(expected = raw_len, actual = decoded.len(), "Frame length mismatch");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Undecodable compression frame");
                break;
            }
        }
        rest = &body[packed_len..];
    }
    out
}
