//! Mock implementations for testing.
//!
//! # Available Mocks
//!
//! - [`MockHttpClient`] - HTTP client with configurable responses
//! - [`MockTransport`] - Realtime transport with event injection
//! - [`InMemoryStorage`] - In-memory persisted state

pub mod http;
pub mod realtime;
pub mod storage;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
pub use realtime::{EmittedEvent, MockTransport};
pub use storage::InMemoryStorage;
