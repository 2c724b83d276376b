//! Cached content shapes.
//!
//! Maps are `BTreeMap` so that persisted documents serialize in a stable order.

mod store;

pub use store::{DataStoreItem, FieldValue};

use serde::Deserializer;
use std::collections::BTreeMap;

/// language code → value
pub type LocalizedValues = BTreeMap<String, String>;

/// content key → language values
pub type TranslationCollection = BTreeMap<String, LocalizedValues>;

/// collection name → keys
pub type TranslationMap = BTreeMap<String, TranslationCollection>;

/// store identifier → records, in server order
pub type StoreMap = BTreeMap<String, Vec<DataStoreItem>>;

/// Helper to deserialize id as either string or integer
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    use std::fmt;

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer")
        }

        fn visit_str<E>(self, value: &str) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_string<E>(self, value: String) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_i64<E>(self, value: i64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}
