//! MemoryStorage - in-memory backend
//!
//! Files live in a shared map; modification times are logical ticks so
//! eviction order is deterministic. Fault injection switches let tests
//! exercise create and write failures.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use contracts::{ContractError, DirEntry, Storage, StorageFile, StorageUsage};

#[derive(Debug, Default)]
struct MemEntry {
    data: Vec<u8>,
    modified_tick: u64,
}

#[derive(Debug, Default)]
struct Inner {
    files: BTreeMap<PathBuf, MemEntry>,
    total_bytes: u64,
    tick: u64,
    fail_create: bool,
    fail_writes: bool,
    fail_deletes: Vec<PathBuf>,
    list_fails: bool,
}

impl Inner {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn used(&self) -> u64 {
        self.files.values().map(|e| e.data.len() as u64).sum()
    }
}

/// Shared in-memory storage (clones see the same files)
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStorage {
    /// Storage reporting `total_bytes` capacity (0 = unknown, no quota)
    pub fn new(total_bytes: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                total_bytes,
                ..Default::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Insert a file directly, newer than everything before it
    pub fn insert_file(&self, path: impl Into<PathBuf>, data: Vec<u8>) {
        let mut inner = self.lock();
        let modified_tick = inner.next_tick();
        inner.files.insert(path.into(), MemEntry { data, modified_tick });
    }

    /// Snapshot of a file's contents
    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.lock().files.get(path).map(|e| e.data.clone())
    }

    pub fn exists(&self, path: &Path) -> bool {
        self.lock().files.contains_key(path)
    }

    pub fn file_count(&self) -> usize {
        self.lock().files.len()
    }

    pub fn set_total_bytes(&self, total_bytes: u64) {
        self.lock().total_bytes = total_bytes;
    }

    /// Make subsequent `create` calls fail
    pub fn set_fail_create(&self, fail: bool) {
        self.lock().fail_create = fail;
    }

    /// Make subsequent file writes fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Make deleting `path` fail
    pub fn fail_delete_of(&self, path: impl Into<PathBuf>) {
        self.lock().fail_deletes.push(path.into());
    }

    /// Make `list_directory` fail
    pub fn set_list_fails(&self, fail: bool) {
        self.lock().list_fails = fail;
    }
}

fn tick_time(tick: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(tick)
}

impl Storage for MemoryStorage {
    type File = MemoryFile;

    fn create(&self, path: &Path) -> Result<MemoryFile, ContractError> {
        let mut inner = self.lock();
        if inner.fail_create {
            return Err(ContractError::storage_create(
                path,
                std::io::Error::other("injected create failure"),
            ));
        }
        let modified_tick = inner.next_tick();
        inner.files.insert(
            path.to_path_buf(),
            MemEntry {
                data: Vec::new(),
                modified_tick,
            },
        );
        Ok(MemoryFile {
            path: path.to_path_buf(),
            inner: self.inner.clone(),
        })
    }

    fn list_directory(&self, path: &Path) -> Result<Vec<DirEntry>, ContractError> {
        let inner = self.lock();
        if inner.list_fails {
            return Err(ContractError::storage_list(path, "injected list failure"));
        }
        Ok(inner
            .files
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .map(|(p, e)| DirEntry {
                name: p
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: p.clone(),
                size: e.data.len() as u64,
                modified: tick_time(e.modified_tick),
            })
            .collect())
    }

    fn delete(&self, path: &Path) -> Result<(), ContractError> {
        let mut inner = self.lock();
        if inner.fail_deletes.iter().any(|p| p == path) {
            return Err(ContractError::storage_delete(path, "injected delete failure"));
        }
        inner
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ContractError::not_found(path))
    }

    fn usage(&self) -> Result<StorageUsage, ContractError> {
        let inner = self.lock();
        Ok(StorageUsage {
            total_bytes: inner.total_bytes,
            used_bytes: inner.used(),
        })
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, ContractError> {
        self.contents(path).ok_or_else(|| ContractError::not_found(path))
    }
}

/// Open file on a [`MemoryStorage`]
#[derive(Debug)]
pub struct MemoryFile {
    path: PathBuf,
    inner: Arc<Mutex<Inner>>,
}

impl MemoryFile {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl StorageFile for MemoryFile {
    fn write(&mut self, bytes: &[u8]) -> Result<(), ContractError> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(ContractError::storage_write(&self.path, "injected write failure"));
        }
        let used = inner.used();
        let total = inner.total_bytes;
        if total > 0 && used + bytes.len() as u64 > total {
            return Err(ContractError::StorageFull {
                requested: bytes.len() as u64,
                available: total.saturating_sub(used),
            });
        }
        let tick = inner.next_tick();
        let entry = inner
            .files
            .get_mut(&self.path)
            .ok_or_else(|| ContractError::not_found(&self.path))?;
        entry.data.extend_from_slice(bytes);
        entry.modified_tick = tick;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), ContractError> {
        if self.lock().fail_writes {
            return Err(ContractError::storage_write(&self.path, "injected sync failure"));
        }
        Ok(())
    }

    fn close(self) -> Result<(), ContractError> {
        Ok(())
    }
}
