//! Storage backends

mod deflate;
mod fs;
mod memory;

pub use deflate::{inflate_frames, DeflateFile, DeflateStorage};
pub use fs::{FsFile, FsStorage};
pub use memory::{MemoryFile, MemoryStorage};
