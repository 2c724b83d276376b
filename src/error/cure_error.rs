//! Error types for each failure domain of the engine.
//!
//! Each enum maps to one row of the error taxonomy. [`CureError`] unifies them
//! for callers that want a single type.

use thiserror::Error;

use super::category::ErrorCategory;
use crate::api::ApiError;
use crate::traits::StorageError;

/// Missing/invalid credentials or a duplicate `configure`.
///
/// Fatal to the call that produced it; the engine stays unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// A required field was empty.
    #[error("{0} cannot be empty")]
    MissingField(&'static str),

    /// The server URL is not an http(s) URL.
    #[error("invalid server URL '{0}'")]
    InvalidServerUrl(String),

    /// `configure` was already accepted for this context.
    #[error("already configured")]
    AlreadyConfigured,

    /// An operation needed a configuration that was never supplied.
    #[error("not configured")]
    NotConfigured,

    /// The context was created outside a tokio runtime.
    #[error("no tokio runtime available")]
    NoRuntime,
}

/// Authentication round trip failure. Nothing retries automatically.
#[derive(Debug, Error)]
pub enum AuthError {
    /// `configure` has not been accepted yet.
    #[error("not configured")]
    NotConfigured,

    /// Transport, status or body failure from the auth endpoint.
    #[error("auth request failed: {0}")]
    Api(#[from] ApiError),

    /// The server answered 2xx but without a token.
    #[error("auth response did not contain a token")]
    MissingToken,
}

/// Per-collection fetch failure. The cache is left untouched.
#[derive(Debug, Error)]
pub enum SyncError {
    /// `configure` has not been accepted yet.
    #[error("not configured")]
    NotConfigured,

    /// No auth token is available.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Transport, status, decrypt or body failure.
    #[error("fetch failed: {0}")]
    Api(#[from] ApiError),

    /// The server answered without the expected content.
    #[error("response for '{0}' was empty or malformed")]
    EmptyResponse(String),
}

/// Key or cipher failure (handshake, encrypted requests, encrypted responses).
#[derive(Debug, Error)]
pub enum CryptoError {
    /// No symmetric key has been derived yet.
    #[error("symmetric key not available")]
    MissingKey,

    /// AES-GCM encryption or tag verification failed.
    #[error("cipher operation failed")]
    Cipher,

    /// A payload field was not valid base64.
    #[error("invalid base64 in '{field}': {source}")]
    Base64 {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    /// The nonce or tag had the wrong length.
    #[error("invalid {field} length: {len}")]
    InvalidLength { field: &'static str, len: usize },

    /// Plaintext could not be encoded to JSON.
    #[error("payload serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Local storage failure. Logged, never fatal.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem error.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Document could not be encoded or decoded.
    #[error("document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// No storage location could be determined.
    #[error("no data directory available")]
    NoDataDir,
}

/// Unified error type for the engine.
#[derive(Debug, Error)]
pub enum CureError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Encryption(#[from] CryptoError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl CureError {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CureError::Configuration(_) => ErrorCategory::Configuration,
            CureError::Auth(AuthError::NotConfigured) => ErrorCategory::Configuration,
            CureError::Auth(AuthError::Api(err)) => err.category(),
            CureError::Auth(AuthError::MissingToken) => ErrorCategory::Auth,
            CureError::Sync(SyncError::NotConfigured) => ErrorCategory::Configuration,
            CureError::Sync(SyncError::NotAuthenticated) => ErrorCategory::Auth,
            CureError::Sync(SyncError::Api(err)) => err.category(),
            CureError::Sync(SyncError::EmptyResponse(_)) => ErrorCategory::Server,
            CureError::Encryption(_) => ErrorCategory::Encryption,
            CureError::Persistence(_) => ErrorCategory::Persistence,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            CureError::Configuration(_) => "E_CONFIG",
            CureError::Auth(_) => "E_AUTH",
            CureError::Sync(_) => "E_SYNC",
            CureError::Encryption(_) => "E_CRYPTO",
            CureError::Persistence(_) => "E_PERSIST",
        }
    }
}
