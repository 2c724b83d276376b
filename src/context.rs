//! The engine's single entry point.
//!
//! A [`CureContext`] owns every component and walks the lifecycle
//! `init -> configure -> run -> shutdown`. Nothing is process-global: two
//! contexts over two storages are fully independent.

use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::adapters::{FileStorage, ReqwestHttpClient, SocketIoTransport};
use crate::api::ApiError;
use crate::auth::CredentialStore;
use crate::cache::ContentCache;
use crate::config::{Configuration, ContextOptions};
use crate::error::{ConfigurationError, CureResult, PersistenceError, SyncError};
use crate::models::DataStoreItem;
use crate::notifier::{Subscription, UpdateEvent, UpdateNotifier};
use crate::protocol::{COLORS_COLLECTION, IMAGES_COLLECTION};
use crate::realtime::{ChannelState, RealtimeChannel};
use crate::storage::{keys, PersistenceLayer};
use crate::subscription::AutoSubscriptionTracker;
use crate::sync::{SyncEngine, SyncPhase};
use crate::traits::{HttpClient, RealtimeTransport, Storage};

/// How the startup sequence after `configure` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupOutcome {
    /// Authenticated and synced.
    Online,
    /// Authentication failed; serving the restored cache.
    Offline,
    /// Authentication failed and there is nothing cached.
    Failed,
}

/// The background startup started by [`CureContext::configure`].
#[derive(Debug)]
pub struct StartupHandle {
    handle: JoinHandle<StartupOutcome>,
}

impl StartupHandle {
    /// Wait for the startup sequence to finish.
    pub async fn wait(self) -> StartupOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Startup task ended abnormally: {}", e);
                StartupOutcome::Failed
            }
        }
    }
}

struct ContextInner {
    runtime: Handle,
    credentials: Arc<CredentialStore>,
    cache: Arc<ContentCache>,
    persistence: PersistenceLayer,
    notifier: Arc<UpdateNotifier>,
    tracker: AutoSubscriptionTracker,
    engine: Arc<SyncEngine>,
    channel: RealtimeChannel,
}

/// Content sync engine handle. Cheap to clone.
#[derive(Clone)]
pub struct CureContext {
    inner: Arc<ContextInner>,
}

impl CureContext {
    /// Context over the production adapters.
    ///
    /// Persistence goes to `options.data_dir`, or the platform data directory.
    pub fn init(options: ContextOptions) -> CureResult<Self> {
        let storage = match options.data_dir {
            Some(dir) => FileStorage::new(dir),
            None => FileStorage::in_default_location().ok_or(PersistenceError::NoDataDir)?,
        };
        info!("Persisting to {}", storage.root().display());

        let http = ReqwestHttpClient::with_timeout(options.http_timeout)
            .map_err(|e| SyncError::Api(ApiError::Http(e)))?;

        Ok(Self::with_components(
            Arc::new(http),
            Arc::new(SocketIoTransport::new()),
            Arc::new(storage),
        )?)
    }

    /// Context over caller-supplied adapters. Must run inside a tokio runtime.
    ///
    /// Restores persisted state immediately.
    pub fn with_components(
        http: Arc<dyn HttpClient>,
        transport: Arc<dyn RealtimeTransport>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, ConfigurationError> {
        let runtime = Handle::try_current().map_err(|_| ConfigurationError::NoRuntime)?;

        let persistence = PersistenceLayer::new(storage);
        let persisted = persistence.load_all();
        info!(
            "Restored {} collections, {} stores, language {}",
            persisted.translations.len(),
            persisted.stores.len(),
            persisted.current_language.as_deref().unwrap_or("en")
        );

        let credentials = Arc::new(CredentialStore::new());
        credentials.restore(persisted.auth_token.clone(), persisted.api_secret.clone());

        let cache = Arc::new(ContentCache::from_persisted(&persisted));
        let notifier = Arc::new(UpdateNotifier::new());
        let engine = Arc::new(SyncEngine::new(
            http,
            credentials.clone(),
            cache.clone(),
            persistence.clone(),
            notifier.clone(),
        ));
        let channel = RealtimeChannel::new(transport, credentials.clone(), engine.clone());

        Ok(Self {
            inner: Arc::new(ContextInner {
                runtime,
                credentials,
                cache,
                persistence,
                notifier,
                tracker: AutoSubscriptionTracker::new(false),
                engine,
                channel,
            }),
        })
    }

    /// Accept a configuration and start authentication in the background.
    ///
    /// A second call, or an invalid configuration, is rejected and changes
    /// nothing.
    pub fn configure(&self, config: Configuration) -> Result<StartupHandle, ConfigurationError> {
        let auto_realtime = config.auto_realtime;
        if let Err(e) = self.inner.credentials.configure(config) {
            warn!("Configuration rejected: {}", e);
            return Err(e);
        }
        self.inner.tracker.reset(auto_realtime);

        let inner = self.inner.clone();
        let handle = self
            .inner
            .runtime
            .spawn(async move { inner.startup(auto_realtime).await });
        Ok(StartupHandle { handle })
    }

    pub fn is_configured(&self) -> bool {
        self.inner.credentials.is_configured()
    }

    // Tracked reads. The first read of an unseen collection or store
    // schedules one background sync.

    /// Value of `key` in `collection` for the current language, or `""`.
    pub fn translation(&self, key: &str, collection: &str) -> String {
        self.track_collection(collection);
        self.inner.cache.translation(key, collection)
    }

    /// Hex color for `key`.
    pub fn color_value(&self, key: &str) -> Option<String> {
        self.track_collection(COLORS_COLLECTION);
        self.inner.cache.get_color(key)
    }

    /// Image URL for `key`.
    pub fn image_url(&self, key: &str) -> Option<String> {
        self.track_collection(IMAGES_COLLECTION);
        self.inner.cache.get_image_url(key)
    }

    /// Records of a data store.
    pub fn store_items(&self, identifier: &str) -> Vec<DataStoreItem> {
        self.track_store(identifier);
        self.inner.cache.get_store_items(identifier)
    }

    /// Untracked lookup in an explicit language.
    pub fn get(&self, collection: &str, key: &str, language: &str) -> String {
        self.inner.cache.get(collection, key, language)
    }

    fn track_collection(&self, name: &str) {
        if !self.inner.tracker.claim_collection(name) {
            return;
        }
        if let Some(known) = self.inner.cache.add_known_tab(name) {
            self.inner.persistence.persist_snapshot(keys::KNOWN_TABS, &known);
        }
        info!("Auto-subscribing to {}", name);

        let engine = self.inner.engine.clone();
        let name = name.to_string();
        self.inner.runtime.spawn(async move {
            engine.sync(&name).await;
        });
    }

    fn track_store(&self, identifier: &str) {
        if !self.inner.tracker.claim_store(identifier) {
            return;
        }
        if let Some(known) = self.inner.cache.add_known_store(identifier) {
            self.inner.persistence.persist_snapshot(keys::KNOWN_STORES, &known);
        }
        info!("Auto-subscribing to store {}", identifier);

        let engine = self.inner.engine.clone();
        let identifier = identifier.to_string();
        self.inner.runtime.spawn(async move {
            engine.sync_store(&identifier).await;
        });
    }

    pub fn language(&self) -> String {
        self.inner.cache.current_language()
    }

    /// Switch the active language and resync everything.
    ///
    /// Blank codes are ignored; the active language is a no-op unless
    /// `force`. Returns whether a resync ran.
    pub async fn set_language(&self, code: &str, force: bool) -> bool {
        let code = code.trim();
        if code.is_empty() {
            warn!("Ignoring blank language code");
            return false;
        }
        let changed = self.inner.cache.set_current_language(code);
        if !changed && !force {
            return false;
        }

        info!("Language set to {}", code);
        self.inner
            .persistence
            .persist_scalar(keys::CURRENT_LANGUAGE, Some(code));
        self.inner.engine.sync_all().await;
        true
    }

    pub async fn authenticate(&self) -> bool {
        self.inner.engine.authenticate().await.is_ok()
    }

    pub async fn sync(&self, name: &str) -> bool {
        self.inner.engine.sync(name).await
    }

    pub async fn sync_store(&self, identifier: &str) -> bool {
        self.inner.engine.sync_store(identifier).await
    }

    pub async fn sync_all(&self) -> bool {
        self.inner.engine.sync_all().await
    }

    pub fn sync_phase(&self, name: &str) -> SyncPhase {
        self.inner.engine.phase(name)
    }

    pub async fn available_languages(&self) -> Vec<String> {
        self.inner.engine.available_languages().await
    }

    pub fn known_collections(&self) -> BTreeSet<String> {
        self.inner.cache.known_tabs()
    }

    pub fn known_stores(&self) -> BTreeSet<String> {
        self.inner.cache.known_stores()
    }

    /// Subscribe to content-update events.
    pub fn subscribe(&self) -> Subscription {
        self.inner.notifier.subscribe()
    }

    pub async fn connect_if_needed(&self) -> bool {
        self.inner.channel.connect_if_needed().await
    }

    pub async fn disconnect(&self) {
        self.inner.channel.disconnect().await
    }

    /// Connected and handshake acknowledged.
    pub fn is_connected(&self) -> bool {
        self.inner.channel.is_connected()
    }

    pub fn channel_state(&self) -> ChannelState {
        self.inner.channel.state()
    }

    /// Wipe cached content, persisted state and the auth token.
    ///
    /// The configuration stays; a later `authenticate` works without
    /// reconfiguring.
    pub fn clear_all_data(&self) {
        info!("Clearing all cached and persisted data");
        self.inner.cache.clear();
        self.inner.persistence.clear_all();
        self.inner.credentials.clear_session();
        self.inner.tracker.reset(self.inner.tracker.is_enabled());
        self.inner.notifier.emit(UpdateEvent::AllCollections);
    }

    /// Close the realtime channel and stop its listener.
    pub async fn shutdown(&self) {
        info!("Shutting down");
        self.inner.channel.shutdown().await;
    }
}

impl ContextInner {
    async fn startup(&self, auto_realtime: bool) -> StartupOutcome {
        let outcome = match self.engine.authenticate().await {
            Ok(_) => {
                self.engine.sync_all().await;
                StartupOutcome::Online
            }
            Err(e) if !self.cache.is_empty() => {
                warn!("Authentication failed, serving cached content: {}", e);
                StartupOutcome::Offline
            }
            Err(e) => {
                error!("Authentication failed with nothing cached: {}", e);
                return StartupOutcome::Failed;
            }
        };

        if auto_realtime {
            self.channel.connect_if_needed().await;
        }
        info!("Startup finished: {:?}", outcome);
        outcome
    }
}
