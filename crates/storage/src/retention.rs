//! Retention Manager - capacity-aware eviction of old sessions
//!
//! Cleanup starts when usage reaches the high water mark and deletes the
//! oldest `.opl` files until usage is at or below the low water mark. The
//! file currently being written is never a candidate.

use std::path::{Path, PathBuf};

use contracts::{ContractError, Storage};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Session file extension considered for eviction
pub const SESSION_EXTENSION: &str = "opl";

/// Water marks as fractions of total capacity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetentionConfig {
    pub high_water: f64,
    pub low_water: f64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            high_water: 0.90,
            low_water: 0.60,
        }
    }
}

/// Outcome of one [`RetentionManager::enforce`] pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetentionReport {
    pub deleted: Vec<PathBuf>,
    pub usage_before: f64,
    pub usage_after: f64,
}

impl RetentionReport {
    pub fn evicted(&self) -> usize {
        self.deleted.len()
    }
}

/// Evicts old session files from a storage directory
#[derive(Debug, Clone)]
pub struct RetentionManager<S> {
    storage: S,
    directory: PathBuf,
    config: RetentionConfig,
}

impl<S: Storage> RetentionManager<S> {
    pub fn new(storage: S, directory: impl Into<PathBuf>, config: RetentionConfig) -> Self {
        Self {
            storage,
            directory: directory.into(),
            config,
        }
    }

    pub fn config(&self) -> RetentionConfig {
        self.config
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// `true` while usage is below the high water mark
    pub fn check_storage(&self) -> Result<bool, ContractError> {
        let usage = self.storage.usage()?;
        Ok(usage.used_fraction() < self.config.high_water)
    }

    /// Delete oldest sessions until usage is at or below the low water mark.
    ///
    /// `active` is skipped regardless of age. Returns whether anything was
    /// deleted.
    pub fn cleanup_old_sessions(&self, active: Option<&Path>) -> Result<bool, ContractError> {
        Ok(!self.evict(active)?.is_empty())
    }

    /// Check usage and clean up when above the high water mark
    #[instrument(name = "retention_enforce", skip(self, active), fields(dir = %self.directory.display()))]
    pub fn enforce(&self, active: Option<&Path>) -> Result<RetentionReport, ContractError> {
        let usage_before = self.storage.usage()?.used_fraction();
        if usage_before < self.config.high_water {
            debug!(usage = usage_before, "Storage below high water");
            return Ok(RetentionReport {
                deleted: Vec::new(),
                usage_before,
                usage_after: usage_before,
            });
        }

        info!(
            usage = usage_before,
            high_water = self.config.high_water,
            "Storage above high water, evicting old sessions"
        );
        let deleted = self.evict(active)?;
        let usage_after = self.storage.usage()?.used_fraction();
        info!(
            evicted = deleted.len(),
            usage = usage_after,
            "Retention pass complete"
        );
        Ok(RetentionReport {
            deleted,
            usage_before,
            usage_after,
        })
    }

    fn evict(&self, active: Option<&Path>) -> Result<Vec<PathBuf>, ContractError> {
        let mut candidates: Vec<_> = self
            .storage
            .list_directory(&self.directory)?
            .into_iter()
            .filter(|e| {
                Path::new(&e.name)
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(SESSION_EXTENSION))
            })
            .filter(|e| active != Some(e.path.as_path()))
            .collect();
        candidates.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));

        let mut deleted = Vec::new();
        for entry in candidates {
            let usage = self.storage.usage()?;
            if usage.used_fraction() <= self.config.low_water {
                break;
            }
            match self.storage.delete(&entry.path) {
                Ok(()) => {
                    info!(path = %entry.path.display(), size = entry.size, "Evicted session");
                    deleted.push(entry.path);
                }
                Err(e) => {
                    warn!(path = %entry.path.display(), error = %e, "Failed to evict session");
                }
            }
        }
        Ok(deleted)
    }
}
