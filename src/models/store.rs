//! Structured data-store records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::protocol::DEFAULT_LANGUAGE;

/// One field of a data-store record.
///
/// The backend sends plain JSON; the variant is chosen by shape. A JSON object
/// is read as a language-code → string map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Localized(BTreeMap<String, String>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value; integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Double(d) => Some(*d),
            FieldValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_localized(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            FieldValue::Localized(map) => Some(map),
            _ => None,
        }
    }

    /// Text for `language`.
    ///
    /// Localized maps fall back to the default language. Plain strings are
    /// returned as-is for every language.
    pub fn localized(&self, language: &str) -> Option<&str> {
        match self {
            FieldValue::Localized(map) => map
                .get(language)
                .or_else(|| map.get(DEFAULT_LANGUAGE))
                .map(String::as_str),
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// One record of a data store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataStoreItem {
    #[serde(rename = "_id", deserialize_with = "super::deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub data: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl DataStoreItem {
    /// Field by name.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.data.get(name)
    }
}
