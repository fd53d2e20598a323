//! # Storage
//!
//! Storage backends and capacity-aware retention.
//!
//! Responsibilities:
//! - `FsStorage`: session files on a local directory with an optional byte quota
//! - `MemoryStorage`: in-memory backend with fault injection for tests
//! - `DeflateStorage`: decorator compressing each write call
//! - `RetentionManager`: evict oldest sessions between high/low water marks
//!
//! ## Usage Example
//!
//! ```ignore
//! use storage::{FsStorage, RetentionConfig, RetentionManager};
//!
//! let storage = Arc::new(FsStorage::new("/sd", Some(512 * 1024 * 1024))?);
//! let retention = RetentionManager::new(storage.clone(), "/sd", RetentionConfig::default());
//! let report = retention.enforce(active.get().as_deref())?;
//! ```

mod backends;
mod retention;

pub use backends::{
    inflate_frames, DeflateFile, DeflateStorage, FsFile, FsStorage, MemoryFile, MemoryStorage,
};
pub use retention::{RetentionConfig, RetentionManager, RetentionReport, SESSION_EXTENSION};
