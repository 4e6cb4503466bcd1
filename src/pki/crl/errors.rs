use thiserror::Error;

use crate::storage::StorageError;

/// CRL-related errors
#[derive(Error, Debug)]
pub enum CrlError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid CRL configuration: {0}")]
    Config(String),

    #[error("CRL rebuild failed: {0}")]
    Rebuild(String),
}

/// Convenient Result type alias
pub type CrlResult<T> = Result<T, CrlError>;
