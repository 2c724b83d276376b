//! Unified error handling for the sync engine.
//!
//! | Category | Raised by | Effect |
//! |----------|-----------|--------|
//! | Configuration | `configure` | call rejected, context unchanged |
//! | Auth | `authenticate` | engine stays unauthenticated |
//! | Network / Server | `sync`, `sync_store` | reported as `false`, cache untouched |
//! | Encryption | handshake, encrypted requests | handshake skipped |
//! | Persistence | disk reads/writes | logged, structure reset to empty on corrupt reads |
//!
//! None of these cross the public context boundary as panics.

mod category;
mod cure_error;

pub use category::ErrorCategory;
pub use cure_error::{
    AuthError, ConfigurationError, CryptoError, CureError, PersistenceError, SyncError,
};

/// Result alias for fallible engine operations.
pub type CureResult<T> = Result<T, CureError>;
