//! FsStorage - session files in a local directory

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{ContractError, DirEntry, Storage, StorageFile, StorageUsage};
use tracing::{debug, instrument};

/// Directory-backed storage.
///
/// With a capacity quota, `usage()` reports the quota as total and the sum
/// of file sizes under the root as used; writes that would exceed the quota
/// fail with `StorageFull`. Without one, total is reported as zero.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
    capacity_bytes: Option<u64>,
    used: Arc<AtomicU64>,
}

impl FsStorage {
    /// Open (creating if needed) the root directory
    pub fn new(root: impl Into<PathBuf>, capacity_bytes: Option<u64>) -> Result<Self, ContractError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| ContractError::storage_create(&root, e))?;

        let storage = Self {
            root,
            capacity_bytes,
            used: Arc::new(AtomicU64::new(0)),
        };
        storage.rescan()?;
        Ok(storage)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn capacity_bytes(&self) -> Option<u64> {
        self.capacity_bytes
    }

    fn release(&self, bytes: u64) {
        let _ = self
            .used
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |u| Some(u.saturating_sub(bytes)));
    }

    /// Recompute used bytes from the directory contents
    fn rescan(&self) -> Result<u64, ContractError> {
        let used = self
            .list_directory(&self.root)?
            .iter()
            .map(|e| e.size)
            .sum();
        self.used.store(used, Ordering::Relaxed);
        Ok(used)
    }
}

impl Storage for FsStorage {
    type File = FsFile;

    #[instrument(name = "fs_create", skip(self), fields(path = %path.display()))]
    fn create(&self, path: &Path) -> Result<FsFile, ContractError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ContractError::storage_create(path, e))?;
        }
        // truncating an existing file releases its bytes
        if let Ok(meta) = fs::metadata(path) {
            self.release(meta.len());
        }
        let file = File::create(path).map_err(|e| ContractError::storage_create(path, e))?;
        debug!("Created file");

        Ok(FsFile {
            path: path.to_path_buf(),
            file,
            capacity_bytes: self.capacity_bytes,
            used: self.used.clone(),
        })
    }

    fn list_directory(&self, path: &Path) -> Result<Vec<DirEntry>, ContractError> {
        let read_dir = fs::read_dir(path).map_err(|e| ContractError::storage_list(path, e.to_string()))?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| ContractError::storage_list(path, e.to_string()))?;
            let meta = match entry.metadata() {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                size: meta.len(),
                modified: meta.modified().map_err(|e| ContractError::storage_list(path, e.to_string()))?,
            });
        }
        Ok(entries)
    }

    #[instrument(name = "fs_delete", skip(self), fields(path = %path.display()))]
    fn delete(&self, path: &Path) -> Result<(), ContractError> {
        let size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        fs::remove_file(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ContractError::not_found(path),
            _ => ContractError::storage_delete(path, e.to_string()),
        })?;
        self.release(size);
        Ok(())
    }

    fn usage(&self) -> Result<StorageUsage, ContractError> {
        let used_bytes = self.rescan()?;
        Ok(StorageUsage {
            total_bytes: self.capacity_bytes.unwrap_or(0),
            used_bytes,
        })
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, ContractError> {
        fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ContractError::not_found(path),
            _ => ContractError::Io(e),
        })
    }
}

/// Open file on an [`FsStorage`]
#[derive(Debug)]
pub struct FsFile {
    path: PathBuf,
    file: File,
    capacity_bytes: Option<u64>,
    used: Arc<AtomicU64>,
}

impl FsFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageFile for FsFile {
    fn write(&mut self, bytes: &[u8]) -> Result<(), ContractError> {
        let len = bytes.len() as u64;
        if let Some(capacity) = self.capacity_bytes {
            let used = self.used.load(Ordering::Relaxed);
            if used + len > capacity {
                return Err(ContractError::StorageFull {
                    requested: len,
                    available: capacity.saturating_sub(used),
                });
            }
        }
        self.file
            .write_all(bytes)
            .map_err(|e| ContractError::storage_write(&self.path, e.to_string()))?;
        self.used.fetch_add(len, Ordering::Relaxed);
        Ok(())
    }

    fn sync(&mut self) -> Result<(), ContractError> {
        self.file
            .sync_data()
            .map_err(|e| ContractError::storage_write(&self.path, e.to_string()))
    }

    fn close(mut self) -> Result<(), ContractError> {
        self.file
            .flush()
            .and_then(|_| self.file.sync_all())
            .map_err(|e| ContractError::storage_write(&self.path, e.to_string()))
    }
}
