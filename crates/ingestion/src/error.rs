//! Ingestion error types

use thiserror::Error;

/// Ingestion errors
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Queue needs at least two slots (one is always kept free)
    #[error("invalid queue capacity {capacity}: at least 2 slots required")]
    InvalidCapacity { capacity: usize },

    /// Producer pacing out of range
    #[error("invalid producer config: {message}")]
    InvalidConfig { message: String },
}

impl IngestionError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;
