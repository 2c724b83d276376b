//! Concrete implementations of trait abstractions.
//!
//! # Adapters
//!
//! - [`ReqwestHttpClient`] - HTTP client using reqwest
//! - [`SocketIoTransport`] - Socket.IO realtime transport using tokio-tungstenite
//! - [`FileStorage`] - File-per-entry persisted state
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides test doubles for all adapters:
//! - [`mock::MockHttpClient`] - Configurable HTTP responses
//! - [`mock::MockTransport`] - Event injection for realtime tests
//! - [`mock::InMemoryStorage`] - In-memory persisted state

pub mod file_storage;
pub mod mock;
pub mod reqwest_http;
pub mod socketio;

pub use file_storage::FileStorage;
pub use mock::{InMemoryStorage, MockHttpClient, MockTransport};
pub use reqwest_http::ReqwestHttpClient;
pub use socketio::{SocketIoConfig, SocketIoTransport};
