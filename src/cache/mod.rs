//! In-memory content cache.
//!
//! One mutex guards translations, data stores, the known-collection sets,
//! declared languages and the current language. Mutations return stamped
//! [`Snapshot`]s of whatever changed so callers can persist after the lock is
//! released; the stamp lets persistence drop a copy that lost the race.

use parking_lot::Mutex;
use std::collections::BTreeSet;

use crate::models::{DataStoreItem, LocalizedValues, StoreMap, TranslationMap};
use crate::protocol::{
    is_full_replace_collection, COLORS_COLLECTION, COLOR_VALUE_KEY, DEFAULT_LANGUAGE,
    IMAGES_COLLECTION, IMAGE_URL_KEY,
};
use crate::storage::{PersistedState, Snapshot};

/// What changed after applying a translation collection.
#[derive(Debug, Clone)]
pub struct TranslationsApplied {
    pub translations: Snapshot<TranslationMap>,
    /// Present only when the collection was not known before.
    pub known_tabs: Option<Snapshot<BTreeSet<String>>>,
}

/// What changed after replacing a store.
#[derive(Debug, Clone)]
pub struct StoreApplied {
    pub stores: Snapshot<StoreMap>,
    pub known_stores: Option<Snapshot<BTreeSet<String>>>,
}

/// What changed after absorbing an auth response.
#[derive(Debug, Clone, Default)]
pub struct AuthAbsorbed {
    pub known_tabs: Option<Snapshot<BTreeSet<String>>>,
    pub known_stores: Option<Snapshot<BTreeSet<String>>>,
    pub languages: Option<Snapshot<Vec<String>>>,
}

#[derive(Debug, Default)]
struct CacheState {
    translations: TranslationMap,
    stores: StoreMap,
    known_tabs: BTreeSet<String>,
    known_stores: BTreeSet<String>,
    languages: Vec<String>,
    current_language: String,
    /// Bumped for every snapshot handed out. Survives `clear`.
    generation: u64,
}

impl CacheState {
    fn stamp<T>(&mut self, value: T) -> Snapshot<T> {
        self.generation += 1;
        Snapshot {
            generation: self.generation,
            value,
        }
    }
}

/// Multi-collection content cache.
#[derive(Debug)]
pub struct ContentCache {
    state: Mutex<CacheState>,
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentCache {
    /// Empty cache with the default language.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CacheState {
                current_language: DEFAULT_LANGUAGE.to_string(),
                ..CacheState::default()
            }),
        }
    }

    /// Cache seeded from persisted state.
    pub fn from_persisted(persisted: &PersistedState) -> Self {
        let current_language = persisted
            .current_language
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        Self {
            state: Mutex::new(CacheState {
                translations: persisted.translations.clone(),
                stores: persisted.stores.clone(),
                known_tabs: persisted.known_tabs.clone(),
                known_stores: persisted.known_stores.clone(),
                languages: persisted.languages.clone(),
                current_language,
                generation: 0,
            }),
        }
    }

    /// Install a fetched translation collection.
    ///
    /// Reserved collections (colors, images) are replaced wholesale. For any
    /// other collection each key in `items` replaces that key's language map;
    /// keys absent from `items` keep their previous values.
    pub fn upsert_translation_collection<I>(&self, name: &str, items: I) -> TranslationsApplied
    where
        I: IntoIterator<Item = (String, LocalizedValues)>,
    {
        let mut state = self.state.lock();

        let collection = state.translations.entry(name.to_string()).or_default();
        if is_full_replace_collection(name) {
            collection.clear();
        }
        for (key, values) in items {
            collection.insert(key, values);
        }

        let known_tabs = if !is_full_replace_collection(name)
            && state.known_tabs.insert(name.to_string())
        {
            let tabs = state.known_tabs.clone();
            Some(state.stamp(tabs))
        } else {
            None
        };

        let translations = state.translations.clone();
        TranslationsApplied {
            translations: state.stamp(translations),
            known_tabs,
        }
    }

    /// Replace a store's records.
    pub fn upsert_store(&self, identifier: &str, items: Vec<DataStoreItem>) -> StoreApplied {
        let mut state = self.state.lock();
        state.stores.insert(identifier.to_string(), items);
        let known_stores = if state.known_stores.insert(identifier.to_string()) {
            let known = state.known_stores.clone();
            Some(state.stamp(known))
        } else {
            None
        };
        let stores = state.stores.clone();
        StoreApplied {
            stores: state.stamp(stores),
            known_stores,
        }
    }

    /// Value of `key` in `collection` for `language`, or `""`.
    pub fn get(&self, collection: &str, key: &str, language: &str) -> String {
        let state = self.state.lock();
        state
            .translations
            .get(collection)
            .and_then(|c| c.get(key))
            .and_then(|values| values.get(language))
            .cloned()
            .unwrap_or_default()
    }

    /// Value of `key` in `collection` for the current language, or `""`.
    pub fn translation(&self, key: &str, collection: &str) -> String {
        let state = self.state.lock();
        state
            .translations
            .get(collection)
            .and_then(|c| c.get(key))
            .and_then(|values| values.get(&state.current_language))
            .cloned()
            .unwrap_or_default()
    }

    /// Hex color for `key`.
    pub fn get_color(&self, key: &str) -> Option<String> {
        self.reserved_value(COLORS_COLLECTION, key, COLOR_VALUE_KEY)
    }

    /// Image URL for `key`.
    pub fn get_image_url(&self, key: &str) -> Option<String> {
        self.reserved_value(IMAGES_COLLECTION, key, IMAGE_URL_KEY)
    }

    fn reserved_value(&self, collection: &str, key: &str, value_key: &str) -> Option<String> {
        let state = self.state.lock();
        state
            .translations
            .get(collection)
            .and_then(|c| c.get(key))
            .and_then(|values| values.get(value_key))
            .filter(|v| !v.is_empty())
            .cloned()
    }

    /// Records of a store, in server order.
    pub fn get_store_items(&self, identifier: &str) -> Vec<DataStoreItem> {
        self.state
            .lock()
            .stores
            .get(identifier)
            .cloned()
            .unwrap_or_default()
    }

    pub fn current_language(&self) -> String {
        self.state.lock().current_language.clone()
    }

    /// Returns true if the language changed.
    pub fn set_current_language(&self, language: &str) -> bool {
        let mut state = self.state.lock();
        if state.current_language == language {
            return false;
        }
        state.current_language = language.to_string();
        true
    }

    pub fn known_tabs(&self) -> BTreeSet<String> {
        self.state.lock().known_tabs.clone()
    }

    pub fn known_stores(&self) -> BTreeSet<String> {
        self.state.lock().known_stores.clone()
    }

    /// Record a collection as known. Returns the new set if it was added.
    pub fn add_known_tab(&self, name: &str) -> Option<Snapshot<BTreeSet<String>>> {
        if is_full_replace_collection(name) {
            return None;
        }
        let mut state = self.state.lock();
        if !state.known_tabs.insert(name.to_string()) {
            return None;
        }
        let tabs = state.known_tabs.clone();
        Some(state.stamp(tabs))
    }

    /// Record a store as known. Returns the new set if it was added.
    pub fn add_known_store(&self, identifier: &str) -> Option<Snapshot<BTreeSet<String>>> {
        let mut state = self.state.lock();
        if !state.known_stores.insert(identifier.to_string()) {
            return None;
        }
        let known = state.known_stores.clone();
        Some(state.stamp(known))
    }

    /// Union server-declared collections and stores into the known sets, and
    /// take the server's language list when it sent one.
    pub fn absorb_auth(&self, tabs: &[String], stores: &[String], languages: &[String]) -> AuthAbsorbed {
        let mut state = self.state.lock();
        let mut absorbed = AuthAbsorbed::default();

        let mut tabs_changed = false;
        for tab in tabs.iter().filter(|t| !t.is_empty() && !is_full_replace_collection(t)) {
            tabs_changed |= state.known_tabs.insert(tab.clone());
        }
        if tabs_changed {
            let tabs = state.known_tabs.clone();
            absorbed.known_tabs = Some(state.stamp(tabs));
        }

        let mut stores_changed = false;
        for store in stores.iter().filter(|s| !s.is_empty()) {
            stores_changed |= state.known_stores.insert(store.clone());
        }
        if stores_changed {
            let known = state.known_stores.clone();
            absorbed.known_stores = Some(state.stamp(known));
        }

        if !languages.is_empty() && state.languages != languages {
            state.languages = languages.to_vec();
            absorbed.languages = Some(state.stamp(languages.to_vec()));
        }

        absorbed
    }

    /// Languages declared by the server (auth or languages endpoint).
    pub fn declared_languages(&self) -> Vec<String> {
        self.state.lock().languages.clone()
    }

    /// Returns the new list if it changed.
    pub fn set_declared_languages(&self, languages: Vec<String>) -> Option<Snapshot<Vec<String>>> {
        let mut state = self.state.lock();
        if state.languages == languages {
            return None;
        }
        state.languages = languages.clone();
        Some(state.stamp(languages))
    }

    /// Language codes that appear in cached translations.
    pub fn cached_languages(&self) -> Vec<String> {
        let state = self.state.lock();
        state
            .translations
            .iter()
            .filter(|(name, _)| !is_full_replace_collection(name))
            .flat_map(|(_, collection)| collection.values())
            .flat_map(|values| values.keys())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn translations_snapshot(&self) -> TranslationMap {
        self.state.lock().translations.clone()
    }

    pub fn stores_snapshot(&self) -> StoreMap {
        self.state.lock().stores.clone()
    }

    /// True when nothing has been cached or restored.
    pub fn is_empty(&self) -> bool {
        let state = self.state.lock();
        state.translations.values().all(|c| c.is_empty()) && state.stores.is_empty()
    }

    /// Drop everything and return to the default language.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        *state = CacheState {
            current_language: DEFAULT_LANGUAGE.to_string(),
            generation: state.generation,
            ..CacheState::default()
        };
    }
}
