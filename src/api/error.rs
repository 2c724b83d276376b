//! REST layer errors.

use thiserror::Error;

use crate::error::{CryptoError, ErrorCategory};
use crate::traits::HttpError;

/// Failure of one REST call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, DNS).
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The body could not be decoded into the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The body was an encrypted envelope that could not be opened.
    #[error("encrypted response: {0}")]
    Crypto(#[from] CryptoError),
}

impl ApiError {
    /// Error category for handling decisions.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::Http(_) => ErrorCategory::Network,
            ApiError::Status { status, .. } if *status == 401 || *status == 403 => {
                ErrorCategory::Auth
            }
            ApiError::Status { .. } | ApiError::Decode(_) => ErrorCategory::Server,
            ApiError::Crypto(_) => ErrorCategory::Encryption,
        }
    }

    /// HTTP status, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_by_status() {
        let unauthorized = ApiError::Status {
            status: 401,
            body: String::new(),
        };
        assert_eq!(unauthorized.category(), ErrorCategory::Auth);
        assert_eq!(unauthorized.status(), Some(401));

        let server = ApiError::Status {
            status: 503,
            body: "busy".to_string(),
        };
        assert_eq!(server.category(), ErrorCategory::Server);
        assert_eq!(server.to_string(), "server returned 503: busy");
    }

    #[test]
    fn test_category_for_transport_and_decode() {
        let err = ApiError::from(HttpError::ConnectionFailed("refused".to_string()));
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.status(), None);

        let err = ApiError::Decode("eof".to_string());
        assert_eq!(err.category(), ErrorCategory::Server);

        let err = ApiError::from(CryptoError::MissingKey);
        assert_eq!(err.category(), ErrorCategory::Encryption);
    }
}
