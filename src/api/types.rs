//! Request and response bodies of the SDK REST endpoints.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::DataStoreItem;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest<'a> {
    pub api_key: &'a str,
    pub project_id: &'a str,
}

/// Response of `POST /api/sdk/auth`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    /// Server-confirmed secret; wins over the configured one.
    #[serde(default)]
    pub project_secret: Option<String>,
    #[serde(default)]
    pub tabs: Vec<String>,
    #[serde(default)]
    pub stores: Vec<String>,
    #[serde(default)]
    pub available_languages: Vec<String>,
}

/// One key of a translation collection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranslationKeyItem {
    pub key: String,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

/// Response of the translations endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranslationResponse {
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// `None` means the body carried no `keys` at all, which is not the same
    /// as an empty collection.
    #[serde(default)]
    pub keys: Option<Vec<TranslationKeyItem>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColorEntry {
    pub key: String,
    #[serde(alias = "color")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageEntry {
    pub key: String,
    pub url: String,
}

/// Colors arrive either as a bare array or wrapped in `{"colors": [...]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ColorsResponse {
    List(Vec<ColorEntry>),
    Wrapped { colors: Vec<ColorEntry> },
}

impl ColorsResponse {
    pub fn into_entries(self) -> Vec<ColorEntry> {
        match self {
            ColorsResponse::List(entries) | ColorsResponse::Wrapped { colors: entries } => entries,
        }
    }
}

/// Images arrive either as a bare array or wrapped in `{"images": [...]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ImagesResponse {
    List(Vec<ImageEntry>),
    Wrapped { images: Vec<ImageEntry> },
}

impl ImagesResponse {
    pub fn into_entries(self) -> Vec<ImageEntry> {
        match self {
            ImagesResponse::List(entries) | ImagesResponse::Wrapped { images: entries } => entries,
        }
    }
}

/// Store records arrive as `{"items": [...]}` or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoreResponse {
    Wrapped { items: Vec<DataStoreItem> },
    List(Vec<DataStoreItem>),
}

impl StoreResponse {
    pub fn into_items(self) -> Vec<DataStoreItem> {
        match self {
            StoreResponse::Wrapped { items } | StoreResponse::List(items) => items,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LanguagesResponse {
    #[serde(default)]
    pub languages: Option<Vec<String>>,
}
