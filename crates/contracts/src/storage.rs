//! Storage trait - persistent medium interface
//!
//! Defines the abstract interface for storage backends.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::ContractError;

/// Open, writable file on a storage backend
pub trait StorageFile: Send {
    /// Append bytes
    ///
    /// # Errors
    /// Returns write error (should include path context)
    fn write(&mut self, bytes: &[u8]) -> Result<(), ContractError>;

    /// Push buffered bytes to the medium
    fn sync(&mut self) -> Result<(), ContractError>;

    /// Close the file
    fn close(self) -> Result<(), ContractError>
    where
        Self: Sized;
}

/// Directory entry returned by [`Storage::list_directory`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// File name without directory
    pub name: String,
    /// Full path
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Last-modified time
    pub modified: SystemTime,
}

/// Total and used capacity of a backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StorageUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

impl StorageUsage {
    /// Used fraction in `[0, 1]`; zero when total is unknown
    pub fn used_fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            self.used_bytes as f64 / self.total_bytes as f64
        }
    }

    /// Used percentage in `[0, 100]`
    pub fn used_percent(&self) -> f64 {
        self.used_fraction() * 100.0
    }

    /// Bytes still available
    pub fn available_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.used_bytes)
    }
}

/// Persistent storage backend
///
/// All implementations must be usable from the consumer and retention
/// contexts at the same time.
pub trait Storage: Send + Sync {
    /// File handle type
    type File: StorageFile;

    /// Create (or truncate) a file for writing
    fn create(&self, path: &Path) -> Result<Self::File, ContractError>;

    /// List regular files in a directory
    fn list_directory(&self, path: &Path) -> Result<Vec<DirEntry>, ContractError>;

    /// Delete a file
    fn delete(&self, path: &Path) -> Result<(), ContractError>;

    /// Current usage snapshot
    fn usage(&self) -> Result<StorageUsage, ContractError>;

    /// Read a whole file back
    fn read(&self, path: &Path) -> Result<Vec<u8>, ContractError>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    type File = S::File;

    fn create(&self, path: &Path) -> Result<Self::File, ContractError> {
        (**self).create(path)
    }

    fn list_directory(&self, path: &Path) -> Result<Vec<DirEntry>, ContractError> {
        (**self).list_directory(path)
    }

    fn delete(&self, path: &Path) -> Result<(), ContractError> {
        (**self).delete(path)
    }

    fn usage(&self) -> Result<StorageUsage, ContractError> {
        (**self).usage()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, ContractError> {
        (**self).read(path)
    }
}
