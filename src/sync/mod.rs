//! Fetch-and-apply of content collections.
//!
//! A name handed to [`SyncEngine::sync`] resolves to one of four fetch
//! strategies:
//!
//! | Name                                   | Target                       |
//! |----------------------------------------|------------------------------|
//! | `__colors__`, `__COLORS_UPDATED__`     | [`SyncTarget::Colors`]       |
//! | `__images__`, `__IMAGES_UPDATED__`     | [`SyncTarget::Images`]       |
//! | a known store not also a known tab     | [`SyncTarget::Store`]        |
//! | anything else                          | [`SyncTarget::Translations`] |

mod engine;

pub use engine::SyncEngine;

use std::collections::BTreeSet;
use std::fmt;

use crate::protocol::{COLORS_COLLECTION, COLORS_UPDATED, IMAGES_COLLECTION, IMAGES_UPDATED};

/// What a sync request fetches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyncTarget {
    Translations(String),
    Colors,
    Images,
    Store(String),
}

impl SyncTarget {
    /// Resolve a collection name against the known store identifiers.
    pub fn resolve(
        name: &str,
        known_tabs: &BTreeSet<String>,
        known_stores: &BTreeSet<String>,
    ) -> Self {
        match name {
            COLORS_COLLECTION | COLORS_UPDATED => SyncTarget::Colors,
            IMAGES_COLLECTION | IMAGES_UPDATED => SyncTarget::Images,
            _ if known_stores.contains(name) && !known_tabs.contains(name) => {
                SyncTarget::Store(name.to_string())
            }
            _ => SyncTarget::Translations(name.to_string()),
        }
    }

    /// Cache collection the target is stored under.
    pub fn collection(&self) -> &str {
        match self {
            SyncTarget::Translations(name) | SyncTarget::Store(name) => name,
            SyncTarget::Colors => COLORS_COLLECTION,
            SyncTarget::Images => IMAGES_COLLECTION,
        }
    }
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncTarget::Store(id) => write!(f, "store:{}", id),
            other => f.write_str(other.collection()),
        }
    }
}

/// Where the most recent sync of a target stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    /// Never synced in this process.
    #[default]
    Idle,
    Fetching,
    Applied,
    Failed,
}
