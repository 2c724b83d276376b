//! Key/value byte storage trait abstraction.
//!
//! The persistence layer stores each document and each scalar under its own
//! name. Backends only need to move bytes; encoding and corruption recovery
//! live above this seam.

use std::fmt;

/// Storage backend errors.
#[derive(Debug, Clone)]
pub enum StorageError {
    /// Failed to read an entry
    ReadFailed(String),
    /// Failed to write an entry
    WriteFailed(String),
    /// Failed to remove an entry
    RemoveFailed(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ReadFailed(msg) => write!(f, "Failed to read entry: {}", msg),
            StorageError::WriteFailed(msg) => write!(f, "Failed to write entry: {}", msg),
            StorageError::RemoveFailed(msg) => write!(f, "Failed to remove entry: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

/// Trait for named byte storage.
///
/// Writes must be atomic per entry: a reader sees either the previous bytes or
/// the new bytes, never a mix.
pub trait Storage: Send + Sync {
    /// Read an entry. `Ok(None)` means the entry does not exist.
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Write an entry, replacing any previous value.
    ///
    /// When `durable` is true the write is flushed to stable storage before
    /// returning.
    fn write(&self, name: &str, bytes: &[u8], durable: bool) -> Result<(), StorageError>;

    /// Remove an entry. Removing a missing entry is not an error.
    fn remove(&self, name: &str) -> Result<(), StorageError>;
}
