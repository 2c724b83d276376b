//! Persistence of cache documents and scalar settings.
//!
//! Each logical structure is one JSON document. A document that fails to parse
//! is deleted and loads as empty. Writes are best-effort; failures are logged
//! and never roll back in-memory state.
//!
//! Cache documents are written from [`Snapshot`]s taken under the cache lock
//! and persisted after it is released, so two writers of one document can
//! finish out of order. Each document remembers the newest generation it
//! wrote and skips anything older.

use serde::de::DeserializeOwned;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::PersistenceError;
use crate::models::{StoreMap, TranslationMap};
use crate::traits::Storage;

/// Entry names.
pub mod keys {
    pub const TRANSLATIONS: &str = "cure_translations.json";
    pub const KNOWN_TABS: &str = "cure_tabs.json";
    pub const STORES: &str = "cure_stores.json";
    pub const KNOWN_STORES: &str = "cure_store_ids.json";
    pub const LANGUAGES: &str = "cure_languages.json";

    pub const AUTH_TOKEN: &str = "auth_token";
    pub const CURRENT_LANGUAGE: &str = "current_language";
    pub const API_SECRET: &str = "api_secret";

    pub const DOCUMENTS: [&str; 5] = [TRANSLATIONS, KNOWN_TABS, STORES, KNOWN_STORES, LANGUAGES];
    pub const SCALARS: [&str; 3] = [AUTH_TOKEN, CURRENT_LANGUAGE, API_SECRET];
}

/// Everything restored at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    pub translations: TranslationMap,
    pub known_tabs: BTreeSet<String>,
    pub stores: StoreMap,
    pub known_stores: BTreeSet<String>,
    pub languages: Vec<String>,
    pub auth_token: Option<String>,
    pub current_language: Option<String>,
    pub api_secret: Option<String>,
}

/// Copy of one cached structure, stamped with the cache generation it was
/// taken at. A higher generation is always the newer copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub generation: u64,
    pub value: T,
}

/// Newest generation written per document.
type WrittenGenerations = Mutex<HashMap<String, Arc<Mutex<u64>>>>;

/// JSON documents and scalars over a [`Storage`] backend.
#[derive(Clone)]
pub struct PersistenceLayer {
    storage: Arc<dyn Storage>,
    written: Arc<WrittenGenerations>,
}

impl PersistenceLayer {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            written: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Load every document and scalar. Never fails.
    pub fn load_all(&self) -> PersistedState {
        PersistedState {
            translations: self.load_document(keys::TRANSLATIONS),
            known_tabs: self.load_document(keys::KNOWN_TABS),
            stores: self.load_document(keys::STORES),
            known_stores: self.load_document(keys::KNOWN_STORES),
            languages: self.load_document(keys::LANGUAGES),
            auth_token: self.load_scalar(keys::AUTH_TOKEN),
            current_language: self.load_scalar(keys::CURRENT_LANGUAGE),
            api_secret: self.load_scalar(keys::API_SECRET),
        }
    }

    /// Load one document. Missing or empty loads as `T::default()`; a corrupt
    /// document is removed and loads as `T::default()`.
    pub fn load_document<T>(&self, name: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let bytes = match self.storage.read(name) {
            Ok(Some(bytes)) if !bytes.iter().all(u8::is_ascii_whitespace) => bytes,
            Ok(_) => return T::default(),
            Err(e) => {
                warn!("Failed to read {}: {}", name, e);
                return T::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                debug!("Loaded {}", name);
                value
            }
            Err(e) => {
                warn!("Discarding corrupt {}: {}", name, e);
                if let Err(e) = self.storage.remove(name) {
                    warn!("Failed to remove corrupt {}: {}", name, e);
                }
                T::default()
            }
        }
    }

    /// Serialize and write one document.
    pub fn save_document<T: Serialize + ?Sized>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec(value)?;
        self.storage.write(name, &bytes, false)?;
        Ok(())
    }

    /// Write a snapshot unless a newer one of the same document was already
    /// written. Logs instead of failing.
    ///
    /// Writers of one document are serialized here; the cache lock is not
    /// involved, so readers never wait on the disk.
    pub fn persist_snapshot<T: Serialize>(&self, name: &str, snapshot: &Snapshot<T>) {
        let slot = self.written.lock().entry(name.to_string()).or_default().clone();
        let mut written = slot.lock();
        if snapshot.generation <= *written {
            debug!(
                "Skipping stale {} (generation {}, on disk {})",
                name, snapshot.generation, *written
            );
            return;
        }
        match self.save_document(name, &snapshot.value) {
            Ok(()) => *written = snapshot.generation,
            Err(e) => warn!("Failed to persist {}: {}", name, e),
        }
    }

    pub fn load_scalar(&self, name: &str) -> Option<String> {
        match self.storage.read(name) {
            Ok(Some(bytes)) => String::from_utf8(bytes).ok().filter(|s| !s.is_empty()),
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read {}: {}", name, e);
                None
            }
        }
    }

    /// Commit a scalar durably, or remove it when `value` is `None`.
    pub fn save_scalar(&self, name: &str, value: Option<&str>) -> Result<(), PersistenceError> {
        match value {
            Some(value) => self.storage.write(name, value.as_bytes(), true)?,
            None => self.storage.remove(name)?,
        }
        Ok(())
    }

    /// [`save_scalar`](Self::save_scalar), logging instead of failing.
    pub fn persist_scalar(&self, name: &str, value: Option<&str>) {
        if let Err(e) = self.save_scalar(name, value) {
            warn!("Failed to persist {}: {}", name, e);
        }
    }

    /// Remove every document and scalar.
    pub fn clear_all(&self) {
        for name in keys::DOCUMENTS.iter().chain(keys::SCALARS.iter()) {
            if let Err(e) = self.storage.remove(name) {
                warn!("Failed to remove {}: {}", name, e);
            }
        }
    }
}
