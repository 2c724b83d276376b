//! Reserved identifiers and realtime event names shared by the wire protocol.
//!
//! Every "magic" string the backend and the engine agree on lives here so the
//! sync logic never compares ad hoc literals.

/// Collection that holds global colors (`key -> {"color": "#RRGGBB"}`).
pub const COLORS_COLLECTION: &str = "__colors__";

/// Collection that holds global image URLs (`key -> {"url": "https://..."}`).
pub const IMAGES_COLLECTION: &str = "__images__";

/// Value key used inside the colors collection.
pub const COLOR_VALUE_KEY: &str = "color";

/// Value key used inside the images collection.
pub const IMAGE_URL_KEY: &str = "url";

/// Realtime payload value meaning "resync everything".
pub const ALL_MARKER: &str = "__ALL__";

/// Update identifier emitted when every collection may have changed.
pub const ALL_SCREENS_UPDATED: &str = "__ALL_SCREENS_UPDATED__";

/// Update identifier emitted when the colors collection changed.
///
/// Also accepted by `sync` as an alias of [`COLORS_COLLECTION`].
pub const COLORS_UPDATED: &str = "__COLORS_UPDATED__";

/// Update identifier emitted when the images collection changed.
pub const IMAGES_UPDATED: &str = "__IMAGES_UPDATED__";

/// Language selected on a fresh install.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Realtime event names. Connection lifecycle arrives as
/// [`TransportEvent`](crate::traits::TransportEvent) variants instead.
pub mod events {
    /// Client -> server encrypted identity proof.
    pub const HANDSHAKE: &str = "handshake";
    /// Server -> client handshake acceptance.
    pub const HANDSHAKE_ACK: &str = "handshake_ack";
    /// Server -> client translation/color/image collection changed.
    pub const TRANSLATIONS_UPDATED: &str = "translationsUpdated";
    /// Server -> client data store changed.
    pub const DATA_STORE_UPDATED: &str = "dataStoreUpdated";
}

/// Returns true for collections that are replaced wholesale on every sync.
pub fn is_full_replace_collection(name: &str) -> bool {
    name == COLORS_COLLECTION || name == IMAGES_COLLECTION
}

/// Returns true if the identifier is the "resync everything" marker.
pub fn is_all_marker(identifier: &str) -> bool {
    identifier.eq_ignore_ascii_case(ALL_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_replace_collections() {
        assert!(is_full_replace_collection(COLORS_COLLECTION));
        assert!(is_full_replace_collection(IMAGES_COLLECTION));
        assert!(!is_full_replace_collection("home"));
        assert!(!is_full_replace_collection(COLORS_UPDATED));
    }

    #[test]
    fn test_all_marker_ignores_case() {
        assert!(is_all_marker("__ALL__"));
        assert!(is_all_marker("__all__"));
        assert!(!is_all_marker("all"));
    }
}
