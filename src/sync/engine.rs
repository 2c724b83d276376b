//! Sync engine: one authenticated fetch per target, applied to the cache,
//! persisted, then announced.
//!
//! No retry and no backoff. Results apply in completion order; when two
//! fetches of the same collection overlap, whichever finishes last wins.

use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{SyncPhase, SyncTarget};
use crate::api::types::AuthResponse;
use crate::api::{CureApiClient, Session};
use crate::auth::{self, CredentialStore};
use crate::cache::ContentCache;
use crate::error::{AuthError, SyncError};
use crate::notifier::{UpdateEvent, UpdateNotifier};
use crate::protocol::{COLORS_COLLECTION, COLOR_VALUE_KEY, IMAGES_COLLECTION, IMAGE_URL_KEY};
use crate::storage::{keys, PersistenceLayer};
use crate::traits::HttpClient;

/// Fetches collections and stores and reconciles them into the cache.
pub struct SyncEngine {
    http: Arc<dyn HttpClient>,
    credentials: Arc<CredentialStore>,
    cache: Arc<ContentCache>,
    persistence: PersistenceLayer,
    notifier: Arc<UpdateNotifier>,
    phases: Mutex<HashMap<SyncTarget, SyncPhase>>,
}

impl SyncEngine {
    pub fn new(
        http: Arc<dyn HttpClient>,
        credentials: Arc<CredentialStore>,
        cache: Arc<ContentCache>,
        persistence: PersistenceLayer,
        notifier: Arc<UpdateNotifier>,
    ) -> Self {
        Self {
            http,
            credentials,
            cache,
            persistence,
            notifier,
            phases: Mutex::new(HashMap::new()),
        }
    }

    /// Run the auth round trip.
    pub async fn authenticate(&self) -> Result<AuthResponse, AuthError> {
        auth::authenticate(
            self.http.clone(),
            &self.credentials,
            &self.cache,
            &self.persistence,
        )
        .await
    }

    /// Resolve a collection name to its fetch strategy.
    pub fn resolve(&self, name: &str) -> SyncTarget {
        SyncTarget::resolve(name, &self.cache.known_tabs(), &self.cache.known_stores())
    }

    /// Sync one collection by name. Returns whether it applied.
    pub async fn sync(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        let target = self.resolve(name);
        self.run(target).await
    }

    /// Sync one data store. Returns whether it applied.
    pub async fn sync_store(&self, identifier: &str) -> bool {
        if identifier.is_empty() {
            return false;
        }
        self.run(SyncTarget::Store(identifier.to_string())).await
    }

    /// Sync every known collection, colors, images and every known store,
    /// then announce [`UpdateEvent::AllCollections`] whatever the outcomes.
    ///
    /// Returns true only if every fetch applied.
    pub async fn sync_all(&self) -> bool {
        let mut targets: Vec<SyncTarget> = self
            .cache
            .known_tabs()
            .into_iter()
            .map(SyncTarget::Translations)
            .collect();
        targets.push(SyncTarget::Colors);
        targets.push(SyncTarget::Images);
        targets.extend(self.cache.known_stores().into_iter().map(SyncTarget::Store));

        info!("Syncing {} targets", targets.len());
        let results = join_all(targets.into_iter().map(|t| self.run(t))).await;
        let failed = results.iter().filter(|ok| !**ok).count();
        if failed > 0 {
            warn!("Full sync finished with {} failures", failed);
        } else {
            info!("Full sync finished");
        }

        self.notifier.emit(UpdateEvent::AllCollections);
        failed == 0
    }

    /// Phase of the most recent sync of `name`.
    pub fn phase(&self, name: &str) -> SyncPhase {
        let target = self.resolve(name);
        self.phases.lock().get(&target).copied().unwrap_or_default()
    }

    /// Phase of the most recent sync of a store.
    pub fn store_phase(&self, identifier: &str) -> SyncPhase {
        self.phases
            .lock()
            .get(&SyncTarget::Store(identifier.to_string()))
            .copied()
            .unwrap_or_default()
    }

    /// Languages offered by the project.
    ///
    /// Server list first, then the languages declared at auth, then the
    /// language codes present in the cache.
    pub async fn available_languages(&self) -> Vec<String> {
        match self.fetch_languages().await {
            Ok(languages) if !languages.is_empty() => {
                if let Some(snapshot) = self.cache.set_declared_languages(languages.clone()) {
                    self.persistence.persist_snapshot(keys::LANGUAGES, &snapshot);
                }
                return languages;
            }
            Ok(_) => debug!("Server returned no languages"),
            Err(e) => warn!("Failed to fetch languages: {}", e),
        }

        let declared = self.cache.declared_languages();
        if !declared.is_empty() {
            return declared;
        }
        self.cache.cached_languages()
    }

    async fn fetch_languages(&self) -> Result<Vec<String>, SyncError> {
        let (api, session) = self.client()?;
        Ok(api.languages(&session).await?)
    }

    fn client(&self) -> Result<(CureApiClient, Session), SyncError> {
        let (config, session) = self.credentials.session()?;
        Ok((CureApiClient::new(self.http.clone(), &config.server_url), session))
    }

    fn set_phase(&self, target: &SyncTarget, phase: SyncPhase) {
        self.phases.lock().insert(target.clone(), phase);
    }

    async fn run(&self, target: SyncTarget) -> bool {
        self.set_phase(&target, SyncPhase::Fetching);
        debug!("Fetching {}", target);

        match self.fetch_and_apply(&target).await {
            Ok(event) => {
                self.set_phase(&target, SyncPhase::Applied);
                info!("Applied {}", target);
                self.notifier.emit(event);
                true
            }
            Err(e) => {
                self.set_phase(&target, SyncPhase::Failed);
                warn!("Sync of {} failed: {}", target, e);
                false
            }
        }
    }

    async fn fetch_and_apply(&self, target: &SyncTarget) -> Result<UpdateEvent, SyncError> {
        let (api, session) = self.client()?;

        match target {
            SyncTarget::Translations(name) => {
                let response = api.translations(&session, name).await?;
                let entries = response
                    .keys
                    .ok_or_else(|| SyncError::EmptyResponse(name.clone()))?;
                let items = entries.into_iter().map(|item| (item.key, item.values));
                self.apply_collection(name, items);
            }
            SyncTarget::Colors => {
                let entries = api.colors(&session).await?;
                let items = entries
                    .into_iter()
                    .map(|e| (e.key, single_value(COLOR_VALUE_KEY, e.value)));
                self.apply_collection(COLORS_COLLECTION, items);
            }
            SyncTarget::Images => {
                let entries = api.images(&session).await?;
                let items = entries
                    .into_iter()
                    .map(|e| (e.key, single_value(IMAGE_URL_KEY, e.url)));
                self.apply_collection(IMAGES_COLLECTION, items);
            }
            SyncTarget::Store(identifier) => {
                let items = api.store(&session, identifier).await?;
                debug!("Store {} returned {} items", identifier, items.len());
                let applied = self.cache.upsert_store(identifier, items);
                self.persistence.persist_snapshot(keys::STORES, &applied.stores);
                if let Some(known) = &applied.known_stores {
                    self.persistence.persist_snapshot(keys::KNOWN_STORES, known);
                }
                return Ok(UpdateEvent::Store(identifier.clone()));
            }
        }

        Ok(UpdateEvent::for_collection(target.collection()))
    }

    fn apply_collection<I>(&self, name: &str, items: I)
    where
        I: IntoIterator<Item = (String, BTreeMap<String, String>)>,
    {
        let applied = self.cache.upsert_translation_collection(name, items);
        self.persistence.persist_snapshot(keys::TRANSLATIONS, &applied.translations);
        if let Some(known) = &applied.known_tabs {
            self.persistence.persist_snapshot(keys::KNOWN_TABS, known);
        }
    }
}

fn single_value(key: &str, value: String) -> BTreeMap<String, String> {
    BTreeMap::from([(key.to_string(), value)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{InMemoryStorage, MockHttpClient, MockResponse};
    use crate::config::Configuration;
    use crate::traits::HttpError;
    use serde_json::json;
    use std::time::Duration;

    const BASE: &str = "http://cms.test";

    struct Fixture {
        http: MockHttpClient,
        storage: InMemoryStorage,
        cache: Arc<ContentCache>,
        notifier: Arc<UpdateNotifier>,
        engine: Arc<SyncEngine>,
    }

    fn fixture() -> Fixture {
        let http = MockHttpClient::new();
        let storage = InMemoryStorage::new();
        let credentials = Arc::new(CredentialStore::new());
        credentials
            .configure(Configuration::new("proj1", "key1", "s1").with_server_url(BASE))
            .unwrap();
        credentials.apply_auth("t1".to_string(), None);

        let cache = Arc::new(ContentCache::new());
        let notifier = Arc::new(UpdateNotifier::new());
        let engine = Arc::new(SyncEngine::new(
            Arc::new(http.clone()),
            credentials,
            cache.clone(),
            PersistenceLayer::new(Arc::new(storage.clone())),
            notifier.clone(),
        ));
        Fixture {
            http,
            storage,
            cache,
            notifier,
            engine,
        }
    }

    fn translations_url(tab: &str) -> String {
        format!("{}/api/sdk/translations/proj1/{}", BASE, tab)
    }

    fn keys_body(pairs: &[(&str, &str, &str)]) -> serde_json::Value {
        let keys: Vec<_> = pairs
            .iter()
            .map(|(key, lang, value)| {
                let mut values = serde_json::Map::new();
                values.insert(lang.to_string(), json!(value));
                json!({"key": key, "values": values})
            })
            .collect();
        json!({ "keys": keys })
    }

    #[tokio::test]
    async fn test_sync_translations_applies_and_announces() {
        let f = fixture();
        f.http.set_response(
            &translations_url("home"),
            MockResponse::json(200, keys_body(&[("title", "en", "Hi")])),
        );
        let mut sub = f.notifier.subscribe();

        assert!(f.engine.sync("home").await);

        assert_eq!(f.cache.get("home", "title", "en"), "Hi");
        assert_eq!(f.cache.get("home", "title", "fr"), "");
        assert!(f.cache.known_tabs().contains("home"));
        assert_eq!(f.engine.phase("home"), SyncPhase::Applied);
        assert_eq!(sub.recv().await, Some(UpdateEvent::Collection("home".into())));
        assert!(f.storage.contains(keys::TRANSLATIONS));
        assert!(f.storage.contains(keys::KNOWN_TABS));

        let request = &f.http.requests_matching("/translations/")[0];
        assert_eq!(request.method, "POST");
        assert_eq!(
            request.headers.get("Authorization").map(String::as_str),
            Some("Bearer t1")
        );
    }

    #[tokio::test]
    async fn test_merge_keeps_keys_absent_from_response() {
        let f = fixture();
        let url = translations_url("home");
        f.http.set_response(
            &url,
            MockResponse::json(200, keys_body(&[("a", "en", "A1"), ("b", "en", "B1")])),
        );
        assert!(f.engine.sync("home").await);

        f.http
            .set_response(&url, MockResponse::json(200, keys_body(&[("a", "en", "A2")])));
        assert!(f.engine.sync("home").await);

        assert_eq!(f.cache.get("home", "a", "en"), "A2");
        assert_eq!(f.cache.get("home", "b", "en"), "B1");
    }

    #[tokio::test]
    async fn test_colors_are_replaced_wholesale() {
        let f = fixture();
        let url = format!("{}/api/sdk/colors/proj1", BASE);
        assert_eq!(f.cache.get_color("brand"), None);

        f.http.set_response(
            &url,
            MockResponse::json(200, json!([{"key": "brand", "value": "#112233"}])),
        );
        let mut sub = f.notifier.subscribe();
        assert!(f.engine.sync(COLORS_COLLECTION).await);
        assert_eq!(f.cache.get_color("brand").as_deref(), Some("#112233"));
        assert_eq!(sub.recv().await, Some(UpdateEvent::Colors));
        assert!(!f.cache.known_tabs().contains(COLORS_COLLECTION));

        f.http.set_response(&url, MockResponse::json(200, json!([])));
        assert!(f.engine.sync(crate::protocol::COLORS_UPDATED).await);
        assert_eq!(f.cache.get_color("brand"), None);
    }

    #[tokio::test]
    async fn test_images_use_url_key() {
        let f = fixture();
        f.http.set_response(
            &format!("{}/api/sdk/images/proj1", BASE),
            MockResponse::json(
                200,
                json!({"images": [{"key": "logo", "url": "https://cdn.test/logo.png"}]}),
            ),
        );
        assert!(f.engine.sync(IMAGES_COLLECTION).await);
        assert_eq!(
            f.cache.get_image_url("logo").as_deref(),
            Some("https://cdn.test/logo.png")
        );
    }

    #[tokio::test]
    async fn test_failure_leaves_cache_untouched() {
        let f = fixture();
        let url = translations_url("home");
        f.http
            .set_response(&url, MockResponse::json(200, keys_body(&[("title", "en", "Hi")])));
        assert!(f.engine.sync("home").await);

        f.http.set_response(&url, MockResponse::json(500, json!({"error": "boom"})));
        assert!(!f.engine.sync("home").await);
        assert_eq!(f.engine.phase("home"), SyncPhase::Failed);
        assert_eq!(f.cache.get("home", "title", "en"), "Hi");

        f.http.set_response(
            &url,
            MockResponse::Error(HttpError::ConnectionFailed("refused".into())),
        );
        assert!(!f.engine.sync("home").await);
        assert_eq!(f.cache.get("home", "title", "en"), "Hi");
    }

    #[tokio::test]
    async fn test_missing_keys_is_a_failure() {
        let f = fixture();
        f.http.set_response(
            &translations_url("home"),
            MockResponse::json(200, json!({"version": 3})),
        );
        assert!(!f.engine.sync("home").await);
        assert!(f.cache.known_tabs().is_empty());
    }

    #[tokio::test]
    async fn test_sync_without_token_fails_without_request() {
        let f = fixture();
        let credentials = Arc::new(CredentialStore::new());
        credentials
            .configure(Configuration::new("proj1", "key1", "s1").with_server_url(BASE))
            .unwrap();
        let engine = SyncEngine::new(
            Arc::new(f.http.clone()),
            credentials,
            f.cache.clone(),
            PersistenceLayer::new(Arc::new(f.storage.clone())),
            f.notifier.clone(),
        );

        assert!(!engine.sync("home").await);
        assert!(f.http.get_requests().is_empty());
    }

    #[tokio::test]
    async fn test_sync_store_replaces_records() {
        let f = fixture();
        let url = format!("{}/api/sdk/store/proj1/products", BASE);
        f.http.set_response(
            &url,
            MockResponse::json(
                200,
                json!({"items": [
                    {"_id": "1", "data": {"name": "A", "price": 10}},
                    {"_id": "2", "data": {"name": "B", "price": 12.5}}
                ]}),
            ),
        );
        let mut sub = f.notifier.subscribe();
        assert!(f.engine.sync_store("products").await);
        assert_eq!(f.cache.get_store_items("products").len(), 2);
        assert_eq!(sub.recv().await, Some(UpdateEvent::Store("products".into())));
        assert!(f.storage.contains(keys::KNOWN_STORES));

        f.http.set_response(
            &url,
            MockResponse::json(200, json!({"items": [{"_id": "3", "data": {}}]})),
        );
        assert!(f.engine.sync("products").await);
        let items = f.cache.get_store_items("products");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "3");
        assert_eq!(f.engine.store_phase("products"), SyncPhase::Applied);
    }

    #[tokio::test]
    async fn test_sync_all_announces_even_on_failure() {
        let f = fixture();
        f.cache.add_known_tab("home");
        f.cache.add_known_store("products");
        f.http.set_response(
            &translations_url("home"),
            MockResponse::json(200, keys_body(&[("title", "en", "Hi")])),
        );
        f.http.set_response(
            &format!("{}/api/sdk/colors/proj1", BASE),
            MockResponse::json(200, json!([])),
        );
        f.http.set_default_response(MockResponse::json(503, json!({})));

        assert!(!f.engine.sync_all().await);

        assert_eq!(f.notifier.latest(), Some(UpdateEvent::AllCollections));
        assert_eq!(f.engine.phase("home"), SyncPhase::Applied);
        assert_eq!(f.engine.phase(IMAGES_COLLECTION), SyncPhase::Failed);
        assert_eq!(f.engine.store_phase("products"), SyncPhase::Failed);
        assert_eq!(f.http.requests_matching("/images/").len(), 1);
        assert_eq!(f.http.requests_matching("/store/").len(), 1);
    }

    #[tokio::test]
    async fn test_last_completion_wins() {
        let f = fixture();
        let url = translations_url("home");
        f.http.set_delayed_response(
            &url,
            MockResponse::json(200, keys_body(&[("title", "en", "slow")])),
            Duration::from_millis(150),
        );

        let engine = f.engine.clone();
        let slow = tokio::spawn(async move { engine.sync("home").await });
        tokio::time::sleep(Duration::from_millis(30)).await;

        f.http
            .set_response(&url, MockResponse::json(200, keys_body(&[("title", "en", "fast")])));
        assert!(f.engine.sync("home").await);
        assert_eq!(f.cache.get("home", "title", "en"), "fast");

        assert!(slow.await.unwrap());
        assert_eq!(f.cache.get("home", "title", "en"), "slow");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_write_of_older_snapshot_does_not_clobber_newer() {
        let f = fixture();
        f.http
            .set_response(&translations_url("a"), MockResponse::json(200, keys_body(&[("k", "en", "A")])));
        f.http
            .set_response(&translations_url("b"), MockResponse::json(200, keys_body(&[("k", "en", "B")])));
        f.storage
            .stall_next_write(keys::TRANSLATIONS, Duration::from_millis(300));

        let engine = f.engine.clone();
        let first = tokio::spawn(async move { engine.sync("a").await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(f.engine.sync("b").await);
        assert!(first.await.unwrap());

        let bytes = f.storage.raw(keys::TRANSLATIONS).unwrap();
        let on_disk: crate::models::TranslationMap = serde_json::from_slice(&bytes).unwrap();
        assert!(on_disk.contains_key("a"));
        assert!(on_disk.contains_key("b"));

        let tabs: std::collections::BTreeSet<String> =
            serde_json::from_slice(&f.storage.raw(keys::KNOWN_TABS).unwrap()).unwrap();
        assert_eq!(tabs.len(), 2);
    }

    #[tokio::test]
    async fn test_available_languages_fallbacks() {
        let f = fixture();
        let url = format!("{}/api/sdk/languages/proj1", BASE);

        f.http
            .set_response(&url, MockResponse::json(200, json!({"languages": ["en", "fr"]})));
        assert_eq!(f.engine.available_languages().await, vec!["en", "fr"]);
        assert!(f.storage.contains(keys::LANGUAGES));

        f.http.set_response(&url, MockResponse::json(500, json!({})));
        assert_eq!(f.engine.available_languages().await, vec!["en", "fr"]);

        f.cache.set_declared_languages(Vec::new());
        f.cache.upsert_translation_collection(
            "home",
            vec![(
                "title".to_string(),
                BTreeMap::from([
                    ("de".to_string(), "Hallo".to_string()),
                    ("en".to_string(), "Hi".to_string()),
                ]),
            )],
        );
        assert_eq!(f.engine.available_languages().await, vec!["de", "en"]);
    }
}
