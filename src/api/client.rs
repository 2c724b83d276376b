//! Typed client for the SDK REST endpoints.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::error::ApiError;
use super::types::{
    AuthRequest, AuthResponse, ColorEntry, ColorsResponse, ImageEntry, ImagesResponse,
    LanguagesResponse, StoreResponse, TranslationResponse,
};
use crate::crypto::{self, EncryptedPayload, SymmetricKey};
use crate::error::CryptoError;
use crate::models::DataStoreItem;
use crate::traits::{Headers, HttpClient, Response};

/// Credentials needed for an authenticated call.
#[derive(Debug, Clone)]
pub struct Session {
    pub project_id: String,
    pub api_key: String,
    pub token: String,
    /// Used for encrypted request bodies and encrypted responses.
    pub key: Option<SymmetricKey>,
}

/// REST client bound to one server.
#[derive(Clone)]
pub struct CureApiClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl CureApiClient {
    pub fn new(http: Arc<dyn HttpClient>, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /api/sdk/auth`.
    pub async fn authenticate(
        &self,
        project_id: &str,
        api_key: &str,
        key: Option<&SymmetricKey>,
    ) -> Result<AuthResponse, ApiError> {
        let url = format!("{}/api/sdk/auth", self.base_url);
        let body = serde_json::to_string(&AuthRequest {
            api_key,
            project_id,
        })?;

        let response = self.http.post(&url, &body, &json_headers()).await?;
        decode(response, key)
    }

    /// Translations of one tab.
    ///
    /// With a symmetric key the request body is the encrypted
    /// `{projectId, screenName}` document; without one a plain GET is issued.
    pub async fn translations(
        &self,
        session: &Session,
        tab: &str,
    ) -> Result<TranslationResponse, ApiError> {
        let url = format!(
            "{}/api/sdk/translations/{}/{}",
            self.base_url,
            urlencoding::encode(&session.project_id),
            urlencoding::encode(tab)
        );
        let headers = session_headers(session);

        let response = match &session.key {
            Some(key) => {
                let payload = crypto::encrypt_json(
                    key,
                    &json!({"projectId": session.project_id, "screenName": tab}),
                    Some(&session.project_id),
                    Some(tab),
                )?;
                let body = serde_json::to_string(&payload)?;
                debug!("POST {} (encrypted body)", url);
                self.http.post(&url, &body, &headers).await?
            }
            None => {
                debug!("GET {}", url);
                self.http.get(&url, &headers).await?
            }
        };

        decode(response, session.key.as_ref())
    }

    /// `GET /api/sdk/colors/{projectId}`.
    pub async fn colors(&self, session: &Session) -> Result<Vec<ColorEntry>, ApiError> {
        let url = format!(
            "{}/api/sdk/colors/{}",
            self.base_url,
            urlencoding::encode(&session.project_id)
        );
        let response = self.http.get(&url, &session_headers(session)).await?;
        decode::<ColorsResponse>(response, session.key.as_ref()).map(ColorsResponse::into_entries)
    }

    /// `GET /api/sdk/images/{projectId}`.
    pub async fn images(&self, session: &Session) -> Result<Vec<ImageEntry>, ApiError> {
        let url = format!(
            "{}/api/sdk/images/{}",
            self.base_url,
            urlencoding::encode(&session.project_id)
        );
        let response = self.http.get(&url, &session_headers(session)).await?;
        decode::<ImagesResponse>(response, session.key.as_ref()).map(ImagesResponse::into_entries)
    }

    /// `GET /api/sdk/store/{projectId}/{apiIdentifier}`.
    pub async fn store(
        &self,
        session: &Session,
        identifier: &str,
    ) -> Result<Vec<DataStoreItem>, ApiError> {
        let url = format!(
            "{}/api/sdk/store/{}/{}",
            self.base_url,
            urlencoding::encode(&session.project_id),
            urlencoding::encode(identifier)
        );
        let response = self.http.get(&url, &session_headers(session)).await?;
        decode::<StoreResponse>(response, session.key.as_ref()).map(StoreResponse::into_items)
    }

    /// `POST /api/sdk/languages/{projectId}`.
    pub async fn languages(&self, session: &Session) -> Result<Vec<String>, ApiError> {
        let url = format!(
            "{}/api/sdk/languages/{}",
            self.base_url,
            urlencoding::encode(&session.project_id)
        );
        let body = json!({"projectId": session.project_id}).to_string();
        let response = self.http.post(&url, &body, &session_headers(session)).await?;
        let parsed: LanguagesResponse = decode(response, session.key.as_ref())?;
        parsed
            .languages
            .ok_or_else(|| ApiError::Decode("missing 'languages'".to_string()))
    }
}

fn json_headers() -> Headers {
    let mut headers = Headers::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers.insert("Accept".to_string(), "application/json".to_string());
    headers
}

fn session_headers(session: &Session) -> Headers {
    let mut headers = json_headers();
    headers.insert(
        "Authorization".to_string(),
        format!("Bearer {}", session.token),
    );
    headers.insert("X-API-Key".to_string(), session.api_key.clone());
    headers
}

/// Check status, open an encrypted envelope if present, and decode.
fn decode<T: DeserializeOwned>(
    response: Response,
    key: Option<&SymmetricKey>,
) -> Result<T, ApiError> {
    if !response.is_success() {
        return Err(ApiError::Status {
            status: response.status,
            body: String::from_utf8_lossy(&response.body).into_owned(),
        });
    }
    if response.body.is_empty() {
        return Err(ApiError::Decode("empty body".to_string()));
    }

    let value: Value = response.json()?;
    let value = match EncryptedPayload::from_value(&value) {
        Some(envelope) => {
            let key = key.ok_or(CryptoError::MissingKey)?;
            crypto::decrypt_json(key, &envelope)?
        }
        None => value,
    };

    Ok(serde_json::from_value(value)?)
}
