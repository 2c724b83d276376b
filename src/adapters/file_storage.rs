//! File-backed storage adapter.
//!
//! Each entry is one file in a directory. Every write goes to its own uniquely
//! named sibling temp file that is renamed over the target, so neither a crash
//! nor two concurrent writers of one entry can leave a torn document behind.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::traits::{Storage, StorageError};

/// Directory under the platform data dir used when none is configured.
const DEFAULT_DIR: &str = "cure-sync";

/// File-based [`Storage`] backend.
///
/// # Example
///
/// ```ignore
/// use cure_sync::adapters::FileStorage;
///
/// let storage = FileStorage::in_default_location().expect("data dir");
/// println!("state lives in {}", storage.root().display());
/// ```
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Store entries under `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store entries under the platform data directory.
    ///
    /// Returns `None` if no data or home directory can be determined.
    pub fn in_default_location() -> Option<Self> {
        let base = dirs::data_dir().or_else(dirs::home_dir)?;
        Some(Self::new(base.join(DEFAULT_DIR)))
    }

    /// Directory holding the entries.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn ensure_root(&self) -> std::io::Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root)?;
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(self.path_for(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed(format!("{}: {}", name, e))),
        }
    }

    fn write(&self, name: &str, bytes: &[u8], durable: bool) -> Result<(), StorageError> {
        let fail = |e: std::io::Error| StorageError::WriteFailed(format!("{}: {}", name, e));

        self.ensure_root().map_err(fail)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", name))
            .suffix(".tmp")
            .tempfile_in(&self.root)
            .map_err(fail)?;
        tmp.write_all(bytes).map_err(fail)?;
        if durable {
            tmp.as_file().sync_all().map_err(fail)?;
        }

        tmp.persist(self.path_for(name))
            .map(|_| ())
            .map_err(|e| fail(e.error))
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::RemoveFailed(format!("{}: {}", name, e))),
        }
    }
}
