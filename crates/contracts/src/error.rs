//! Layered error definitions
//!
//! Categorized by source: config / storage / session

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Storage Errors =====
    /// File could not be created
    #[error("failed to create '{}': {source}", path.display())]
    StorageCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Write or sync failed
    #[error("write to '{}' failed: {message}", path.display())]
    StorageWrite { path: PathBuf, message: String },

    /// Directory listing failed
    #[error("cannot list '{}': {message}", path.display())]
    StorageList { path: PathBuf, message: String },

    /// Delete failed
    #[error("cannot delete '{}': {message}", path.display())]
    StorageDelete { path: PathBuf, message: String },

    /// Backing store has no room for the write
    #[error("storage full: {requested} bytes requested, {available} available")]
    StorageFull { requested: u64, available: u64 },

    /// Path does not exist
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create storage create error
    pub fn storage_create(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::StorageCreate {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create storage write error
    pub fn storage_write(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::StorageWrite {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Create directory listing error
    pub fn storage_list(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::StorageList {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Create delete error
    pub fn storage_delete(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::StorageDelete {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Create not-found error
    pub fn not_found(path: impl AsRef<Path>) -> Self {
        Self::NotFound {
            path: path.as_ref().to_path_buf(),
        }
    }
}
