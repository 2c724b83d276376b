//! In-memory storage for testing.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::traits::{Storage, StorageError};

/// In-memory [`Storage`] backend.
///
/// Clones share the same entries, so a test can hand one clone to the engine
/// and inspect or corrupt entries through another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    durable_writes: Arc<Mutex<Vec<String>>>,
    fail_writes: Arc<AtomicBool>,
    stalls: Arc<Mutex<HashMap<String, Duration>>>,
}

impl InMemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Put raw bytes under `name`, bypassing the engine.
    pub fn insert_raw(&self, name: &str, bytes: impl Into<Vec<u8>>) {
        self.entries.lock().insert(name.to_string(), bytes.into());
    }

    /// Raw bytes stored under `name`.
    pub fn raw(&self, name: &str) -> Option<Vec<u8>> {
        self.entries.lock().get(name).cloned()
    }

    /// Whether an entry exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().contains_key(name)
    }

    /// Names written with `durable = true`, in order.
    pub fn durable_writes(&self) -> Vec<String> {
        self.durable_writes.lock().clone()
    }

    /// Make every write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Block the calling thread for `delay` before the next write of `name`
    /// lands. Applies once.
    pub fn stall_next_write(&self, name: &str, delay: Duration) {
        self.stalls.lock().insert(name.to_string(), delay);
    }
}

impl Storage for InMemoryStorage {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.lock().get(name).cloned())
    }

    fn write(&self, name: &str, bytes: &[u8], durable: bool) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed(format!("{}: disk full", name)));
        }
        let stall = self.stalls.lock().remove(name);
        if let Some(delay) = stall {
            std::thread::sleep(delay);
        }
        self.entries.lock().insert(name.to_string(), bytes.to_vec());
        if durable {
            self.durable_writes.lock().push(name.to_string());
        }
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(name);
        Ok(())
    }
}
