//! REST API client for the content backend.
//!
//! | Endpoint | Method |
//! |---|---|
//! | `/api/sdk/auth` | POST |
//! | `/api/sdk/translations/{projectId}/{tabName}` | POST (encrypted body) or GET |
//! | `/api/sdk/colors/{projectId}` | GET |
//! | `/api/sdk/images/{projectId}` | GET |
//! | `/api/sdk/store/{projectId}/{apiIdentifier}` | GET |
//! | `/api/sdk/languages/{projectId}` | POST |
//!
//! Every response may be an encrypted envelope; it is opened with the
//! session's symmetric key before decoding.

mod client;
mod error;
pub mod types;

pub use client::{CureApiClient, Session};
pub use error::ApiError;
