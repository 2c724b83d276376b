//! Error category classification for unified error handling.
//!
//! Categories drive what a caller does next: retry later, re-run
//! `configure`, or ignore because the engine already recovered.

use std::fmt;

/// High-level categorization of errors for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing or invalid credentials, duplicate configure.
    /// Not retryable until the host supplies a valid configuration.
    Configuration,

    /// Authentication round trip failed or returned no token.
    /// Retryable by an explicit `authenticate` call.
    Auth,

    /// Transport failures (connection refused, timeout, DNS).
    /// Generally transient.
    Network,

    /// Backend answered with an error status or an unusable body.
    Server,

    /// Key derivation or cipher failure.
    Encryption,

    /// Local disk read/write failure. The engine logs and continues.
    Persistence,
}

impl ErrorCategory {
    /// Returns true if errors in this category are generally transient
    /// and the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::Network | ErrorCategory::Server | ErrorCategory::Auth)
    }

    /// Returns a short label for the category suitable for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Network => "network",
            ErrorCategory::Server => "server",
            ErrorCategory::Encryption => "encryption",
            ErrorCategory::Persistence => "persistence",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
