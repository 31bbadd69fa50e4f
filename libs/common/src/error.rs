//! Custom error types for the common library
//!
//! This module defines the errors raised by the device-local storage layer
//! that the session, cache and door statistics all sit on.

use thiserror::Error;

/// Custom error type for key-value storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error occurred while reading or writing the backing file
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be encoded or decoded
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store is in a state where it cannot be used (poisoned lock, bad path)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Type alias for Result with StorageError
pub type StorageResult<T> = Result<T, StorageError>;
