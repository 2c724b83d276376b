//! Application-level realtime messages.
//!
//! Outbound there is only the handshake. Inbound the server sends the
//! handshake acknowledgement and two content-update notices.

use serde::Deserialize;
use serde_json::Value;

use crate::crypto::{self, SymmetricKey};
use crate::error::CryptoError;
use crate::protocol::events;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslationsUpdatedPayload {
    screen_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataStoreUpdatedPayload {
    store_api_identifier: String,
}

/// A server event the channel acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    HandshakeAck,
    /// A translation collection (or `__ALL__`) changed.
    TranslationsUpdated(String),
    /// A data store (or `__ALL__`) changed.
    DataStoreUpdated(String),
}

/// Why an inbound event was not understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    UnknownEvent(String),
    InvalidPayload { event: String, reason: String },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnknownEvent(name) => write!(f, "unknown event '{}'", name),
            ParseError::InvalidPayload { event, reason } => {
                write!(f, "invalid '{}' payload: {}", event, reason)
            }
        }
    }
}

impl ServerEvent {
    /// Interpret a named event and its payload.
    ///
    /// Socket.IO delivers a single argument either as the object itself or,
    /// from some servers, wrapped in a one-element array; both are accepted.
    pub fn parse(name: &str, payload: &Value) -> Result<Self, ParseError> {
        let payload = match payload {
            Value::Array(items) if items.len() == 1 => &items[0],
            other => other,
        };

        match name {
            events::HANDSHAKE_ACK => Ok(ServerEvent::HandshakeAck),
            events::TRANSLATIONS_UPDATED => {
                let parsed: TranslationsUpdatedPayload = decode_payload(name, payload)?;
                Ok(ServerEvent::TranslationsUpdated(parsed.screen_name))
            }
            events::DATA_STORE_UPDATED => {
                let parsed: DataStoreUpdatedPayload = decode_payload(name, payload)?;
                Ok(ServerEvent::DataStoreUpdated(parsed.store_api_identifier))
            }
            other => Err(ParseError::UnknownEvent(other.to_string())),
        }
    }
}

fn decode_payload<T: serde::de::DeserializeOwned>(
    event: &str,
    payload: &Value,
) -> Result<T, ParseError> {
    serde_json::from_value(payload.clone()).map_err(|e| ParseError::InvalidPayload {
        event: event.to_string(),
        reason: e.to_string(),
    })
}

/// Encrypted `handshake` payload: `{iv, ciphertext, tag, projectId}`.
pub fn handshake_payload(key: &SymmetricKey, project_id: &str) -> Result<Value, CryptoError> {
    let envelope = crypto::encrypt_json(
        key,
        &serde_json::json!({ "projectId": project_id }),
        Some(project_id),
        None,
    )?;
    Ok(serde_json::to_value(envelope)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::EncryptedPayload;
    use serde_json::json;

    #[test]
    fn test_parse_translations_updated() {
        let event = ServerEvent::parse("translationsUpdated", &json!({"screenName": "home"}));
        assert_eq!(event, Ok(ServerEvent::TranslationsUpdated("home".into())));

        let wrapped = ServerEvent::parse("translationsUpdated", &json!([{"screenName": "__ALL__"}]));
        assert_eq!(wrapped, Ok(ServerEvent::TranslationsUpdated("__ALL__".into())));
    }

    #[test]
    fn test_parse_data_store_updated() {
        let event = ServerEvent::parse(
            "dataStoreUpdated",
            &json!({"storeApiIdentifier": "products"}),
        );
        assert_eq!(event, Ok(ServerEvent::DataStoreUpdated("products".into())));
    }

    #[test]
    fn test_parse_ack_ignores_payload() {
        assert_eq!(
            ServerEvent::parse("handshake_ack", &Value::Null),
            Ok(ServerEvent::HandshakeAck)
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            ServerEvent::parse("translationsUpdated", &json!({"screen": "home"})),
            Err(ParseError::InvalidPayload { .. })
        ));
        assert_eq!(
            ServerEvent::parse("pong", &Value::Null),
            Err(ParseError::UnknownEvent("pong".into()))
        );
    }

    #[test]
    fn test_handshake_payload_round_trip() {
        let key = SymmetricKey::derive("s3cr3t");
        let payload = handshake_payload(&key, "proj1").unwrap();

        assert_eq!(payload["projectId"], "proj1");
        assert!(payload.get("screenName").is_none());

        let envelope = EncryptedPayload::from_value(&payload).unwrap();
        let decrypted = crypto::decrypt_json(&key, &envelope).unwrap();
        assert_eq!(decrypted, json!({"projectId": "proj1"}));
    }
}
