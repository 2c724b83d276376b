//! Realtime transport trait abstraction.
//!
//! The engine speaks in named events with JSON payloads. Framing (Socket.IO
//! over WebSocket in production) stays behind this trait, so the channel logic
//! can be driven by a scripted transport in tests.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

/// Something the transport observed.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The connection is open and the namespace joined.
    Connected,
    /// The connection dropped. The transport may reconnect on its own.
    Disconnected { reason: String },
    /// A connection attempt failed.
    ConnectError { message: String },
    /// A named event from the server.
    Event { name: String, payload: Value },
}

/// Realtime transport errors.
#[derive(Debug, Clone)]
pub enum TransportError {
    /// Connection failed
    ConnectionFailed(String),
    /// Not connected
    Disconnected,
    /// Failed to send an event
    SendFailed(String),
    /// Malformed frame from the server
    Protocol(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            TransportError::Disconnected => write!(f, "Disconnected from server"),
            TransportError::SendFailed(msg) => write!(f, "Send failed: {}", msg),
            TransportError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// Trait for an event-based realtime transport.
///
/// `open` starts the connection and returns immediately; the outcome is
/// reported through [`TransportEvent::Connected`] or
/// [`TransportEvent::ConnectError`] on the subscription. Reconnection after a
/// drop is the transport's responsibility.
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Begin connecting to `url`. A no-op while the connection is open or
    /// still being attempted; after `close` it starts over.
    async fn open(&self, url: &str) -> Result<(), TransportError>;

    /// Emit a named event with a JSON payload.
    async fn emit(&self, event: &str, payload: Value) -> Result<(), TransportError>;

    /// Subscribe to transport events.
    ///
    /// Multiple subscribers can exist simultaneously; each receives a copy of
    /// every event published after it subscribed.
    fn subscribe(&self) -> broadcast::Receiver<TransportEvent>;

    /// Whether the underlying connection is currently open.
    fn is_connected(&self) -> bool;

    /// Close the connection and stop reconnecting.
    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        assert_eq!(
            TransportError::ConnectionFailed("refused".to_string()).to_string(),
            "Connection failed: refused"
        );
        assert_eq!(
            TransportError::Disconnected.to_string(),
            "Disconnected from server"
        );
        assert_eq!(
            TransportError::Protocol("bad frame".to_string()).to_string(),
            "Protocol error: bad frame"
        );
    }

    #[test]
    fn test_transport_event_equality() {
        let a = TransportEvent::Event {
            name: "handshake_ack".to_string(),
            payload: serde_json::json!({}),
        };
        assert_eq!(a.clone(), a);
        assert_ne!(a, TransportEvent::Connected);
    }
}
