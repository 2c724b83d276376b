//! Configuration and credential state.
//!
//! Holds the accepted configuration, the active project secret, the symmetric
//! key derived from it, and the auth token, all under one lock. Readers take
//! copies; no network call ever runs while the lock is held.

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::api::Session;
use crate::config::Configuration;
use crate::crypto::SymmetricKey;
use crate::error::{ConfigurationError, SyncError};

#[derive(Debug, Default)]
struct CredentialState {
    config: Option<Configuration>,
    /// Secret the key was derived from. Server-confirmed once known.
    secret: Option<String>,
    key: Option<SymmetricKey>,
    token: Option<String>,
}

/// Configuration, symmetric key and auth token.
#[derive(Debug, Default)]
pub struct CredentialStore {
    state: RwLock<CredentialState>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from persisted scalars before `configure`.
    ///
    /// A persisted secret only serves until the host configures; `configure`
    /// always re-derives from the configured secret.
    pub fn restore(&self, token: Option<String>, secret: Option<String>) {
        let mut state = self.state.write();
        state.token = token.filter(|t| !t.is_empty());
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            state.key = Some(SymmetricKey::derive(&secret));
            state.secret = Some(secret);
            debug!("Symmetric key derived from persisted secret");
        }
    }

    /// Accept a configuration once and derive the key from its secret.
    ///
    /// Only a later auth response carrying a server secret replaces it.
    pub fn configure(&self, config: Configuration) -> Result<(), ConfigurationError> {
        config.validate()?;

        let mut state = self.state.write();
        if state.config.is_some() {
            return Err(ConfigurationError::AlreadyConfigured);
        }
        if matches!(state.secret.as_deref(), Some(s) if s != config.project_secret) {
            debug!("Configured secret replaces the persisted one");
        }
        state.key = Some(SymmetricKey::derive(&config.project_secret));
        state.secret = Some(config.project_secret.clone());
        info!("Configured project {}", config.project_id);
        state.config = Some(config);
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.state.read().config.is_some()
    }

    pub fn configuration(&self) -> Option<Configuration> {
        self.state.read().config.clone()
    }

    pub fn symmetric_key(&self) -> Option<SymmetricKey> {
        self.state.read().key.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    pub fn secret(&self) -> Option<String> {
        self.state.read().secret.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().token.is_some()
    }

    /// Store a fresh token and, when the server sent one, its secret.
    ///
    /// Returns true if the secret changed and the key was re-derived.
    pub fn apply_auth(&self, token: String, server_secret: Option<String>) -> bool {
        let mut state = self.state.write();
        state.token = Some(token);

        match server_secret.filter(|s| !s.is_empty()) {
            Some(secret) if state.secret.as_deref() != Some(secret.as_str()) => {
                info!("Project secret rotated by server, re-deriving key");
                state.key = Some(SymmetricKey::derive(&secret));
                state.secret = Some(secret);
                true
            }
            _ => false,
        }
    }

    /// Drop the token and any server secret; fall back to the configured one.
    pub fn clear_session(&self) {
        let mut state = self.state.write();
        state.token = None;
        match state.config.as_ref().map(|c| c.project_secret.clone()) {
            Some(secret) => {
                state.key = Some(SymmetricKey::derive(&secret));
                state.secret = Some(secret);
            }
            None => {
                state.key = None;
                state.secret = None;
            }
        }
    }

    /// Everything an authenticated REST call needs.
    pub fn session(&self) -> Result<(Configuration, Session), SyncError> {
        let state = self.state.read();
        let config = state.config.clone().ok_or(SyncError::NotConfigured)?;
        let token = match &state.token {
            Some(token) => token.clone(),
            None => {
                warn!("No auth token available");
                return Err(SyncError::NotAuthenticated);
            }
        };
        let session = Session {
            project_id: config.project_id.clone(),
            api_key: config.api_key.clone(),
            token,
            key: state.key.clone(),
        };
        Ok((config, session))
    }
}

/// First eight characters of a token, for logs.
pub fn token_preview(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{}...", prefix)
}
