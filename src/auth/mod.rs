//! Authentication against the content backend.
//!
//! One round trip: `POST /api/sdk/auth` with the api key and project id. A
//! successful response carries the token, optionally a rotated project secret,
//! and the collections, stores and languages the project declares.

pub mod credentials;

pub use credentials::{token_preview, CredentialStore};

use std::sync::Arc;
use tracing::{info, warn};

use crate::api::types::AuthResponse;
use crate::api::CureApiClient;
use crate::cache::ContentCache;
use crate::error::AuthError;
use crate::storage::{keys, PersistenceLayer};
use crate::traits::HttpClient;

/// Authenticate and absorb the response into credentials and cache.
///
/// On failure nothing changes; no retry is scheduled.
pub async fn authenticate(
    http: Arc<dyn HttpClient>,
    credentials: &CredentialStore,
    cache: &ContentCache,
    persistence: &PersistenceLayer,
) -> Result<AuthResponse, AuthError> {
    let config = credentials.configuration().ok_or(AuthError::NotConfigured)?;
    let api = CureApiClient::new(http, &config.server_url);
    let key = credentials.symmetric_key();

    info!("Authenticating project {}", config.project_id);
    let response = api
        .authenticate(&config.project_id, &config.api_key, key.as_ref())
        .await
        .map_err(|e| {
            warn!("Auth failed: {}", e);
            AuthError::Api(e)
        })?;

    let token = match response.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => token.to_string(),
        None => {
            warn!("Auth failed: response missing token");
            return Err(AuthError::MissingToken);
        }
    };

    credentials.apply_auth(token.clone(), response.project_secret.clone());
    persistence.persist_scalar(keys::AUTH_TOKEN, Some(&token));
    persistence.persist_scalar(keys::API_SECRET, credentials.secret().as_deref());

    let absorbed = cache.absorb_auth(
        &response.tabs,
        &response.stores,
        &response.available_languages,
    );
    if let Some(tabs) = &absorbed.known_tabs {
        persistence.persist_snapshot(keys::KNOWN_TABS, tabs);
    }
    if let Some(stores) = &absorbed.known_stores {
        persistence.persist_snapshot(keys::KNOWN_STORES, stores);
    }
    if let Some(languages) = &absorbed.languages {
        persistence.persist_snapshot(keys::LANGUAGES, languages);
    }

    info!(
        "Auth successful. Token: {}, known tabs: {}",
        token_preview(&token),
        cache.known_tabs().len()
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{InMemoryStorage, MockHttpClient, MockResponse};
    use crate::config::Configuration;
    use crate::crypto::SymmetricKey;
    use serde_json::json;

    struct Fixture {
        http: MockHttpClient,
        storage: InMemoryStorage,
        credentials: CredentialStore,
        cache: ContentCache,
        persistence: PersistenceLayer,
    }

    fn fixture() -> Fixture {
        let storage = InMemoryStorage::new();
        let credentials = CredentialStore::new();
        credentials
            .configure(Configuration::new("proj1", "key1", "s1").with_server_url("http://cms.test"))
            .unwrap();
        Fixture {
            http: MockHttpClient::new(),
            persistence: PersistenceLayer::new(Arc::new(storage.clone())),
            storage,
            credentials,
            cache: ContentCache::new(),
        }
    }

    async fn run(f: &Fixture) -> Result<AuthResponse, AuthError> {
        authenticate(Arc::new(f.http.clone()), &f.credentials, &f.cache, &f.persistence).await
    }

    #[tokio::test]
    async fn test_successful_auth_absorbs_response() {
        let f = fixture();
        f.http.set_response(
            "http://cms.test/api/sdk/auth",
            MockResponse::json(
                200,
                json!({
                    "token": "t1",
                    "projectSecret": "s2",
                    "tabs": ["home"],
                    "stores": ["products"],
                    "availableLanguages": ["en", "fr"]
                }),
            ),
        );

        run(&f).await.unwrap();

        assert_eq!(f.credentials.token().as_deref(), Some("t1"));
        assert_eq!(f.credentials.symmetric_key(), Some(SymmetricKey::derive("s2")));
        assert!(f.cache.known_tabs().contains("home"));
        assert!(f.cache.known_stores().contains("products"));
        assert_eq!(f.storage.raw(keys::AUTH_TOKEN), Some(b"t1".to_vec()));
        assert_eq!(f.storage.raw(keys::API_SECRET), Some(b"s2".to_vec()));
        assert!(f.storage.contains(keys::KNOWN_TABS));
        assert!(f.storage.durable_writes().contains(&keys::AUTH_TOKEN.to_string()));
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_side_effects() {
        let f = fixture();
        f.http
            .set_default_response(MockResponse::json(200, json!({"tabs": ["home"]})));

        assert!(matches!(run(&f).await, Err(AuthError::MissingToken)));
        assert!(!f.credentials.is_authenticated());
        assert!(f.cache.known_tabs().is_empty());
    }

    #[tokio::test]
    async fn test_http_error_fails() {
        let f = fixture();
        f.http
            .set_default_response(MockResponse::json(401, json!({"error": "bad key"})));

        let err = run(&f).await.unwrap_err();
        assert!(matches!(err, AuthError::Api(_)));
        assert!(!f.storage.contains(keys::AUTH_TOKEN));
    }

    #[tokio::test]
    async fn test_not_configured() {
        let f = fixture();
        let credentials = CredentialStore::new();
        let result = authenticate(
            Arc::new(f.http.clone()),
            &credentials,
            &f.cache,
            &f.persistence,
        )
        .await;
        assert!(matches!(result, Err(AuthError::NotConfigured)));
        assert!(f.http.get_requests().is_empty());
    }
}
