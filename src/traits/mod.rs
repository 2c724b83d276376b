//! Trait abstractions for dependency injection and testability.
//!
//! # Traits
//!
//! - [`HttpClient`] - HTTP client operations (GET, POST)
//! - [`RealtimeTransport`] - Event-based realtime connection
//! - [`Storage`] - Named byte storage for persisted state

pub mod http;
pub mod realtime;
pub mod storage;

pub use http::{Headers, HttpClient, HttpError, Response};
pub use realtime::{RealtimeTransport, TransportError, TransportEvent};
pub use storage::{Storage, StorageError};
