//! cure-sync - content synchronization and offline cache engine for the
//! CMSCure content SDK.
//!
//! A [`CureContext`] authenticates a project, keeps a multi-collection cache of
//! localized text, colors, image URLs and data-store records fresh over REST
//! and a realtime push channel, and persists everything so a restart (or an
//! offline start) serves the last known content.
//!
//! ```ignore
//! use cure_sync::{Configuration, ContextOptions, CureContext};
//!
//! let context = CureContext::init(ContextOptions::default())?;
//! context.configure(Configuration::new("proj1", "key1", "s3cr3t"))?;
//! let title = context.translation("title", "home");
//! ```

pub mod adapters;
pub mod api;
pub mod auth;
pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod models;
pub mod notifier;
pub mod protocol;
pub mod realtime;
pub mod storage;
pub mod subscription;
pub mod sync;
pub mod traits;

pub use config::{Configuration, ContextOptions};
pub use context::{CureContext, StartupHandle, StartupOutcome};
pub use error::{CureError, CureResult};
pub use models::{DataStoreItem, FieldValue};
pub use notifier::{Subscription, UpdateEvent};
pub use realtime::ChannelState;
pub use sync::SyncPhase;
