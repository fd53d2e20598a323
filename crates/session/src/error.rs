//! Session error types

use codec::CodecError;
use contracts::ContractError;
use thiserror::Error;

/// Session manager errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Storage backend failure (create, write, sync, close)
    #[error("storage error: {0}")]
    Storage(#[from] ContractError),

    /// Record could not be encoded
    #[error("encode error: {0}")]
    Codec(#[from] CodecError),
}

/// Session Result alias
pub type Result<T> = std::result::Result<T, SessionError>;
