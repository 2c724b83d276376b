//! Mock realtime transport for testing.
//!
//! Lets a test play the server: inject events, observe what the engine
//! emits, and decide whether opening the connection succeeds.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::protocol::events;
use crate::traits::{RealtimeTransport, TransportError, TransportEvent};

/// An event emitted by the engine through the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedEvent {
    pub name: String,
    pub payload: Value,
}

/// Mock realtime transport.
///
/// By default `open` succeeds and publishes [`TransportEvent::Connected`].
/// With [`MockTransport::auto_ack`] enabled, every `handshake` emit is answered
/// with `handshake_ack`.
///
/// # Example
///
/// ```ignore
/// use cure_sync::adapters::mock::MockTransport;
///
/// let transport = MockTransport::new();
/// transport.inject_event("translationsUpdated", serde_json::json!({"screenName": "home"}));
/// ```
#[derive(Debug, Clone)]
pub struct MockTransport {
    events_tx: broadcast::Sender<TransportEvent>,
    connected: Arc<AtomicBool>,
    refuse_connect: Arc<AtomicBool>,
    auto_ack: Arc<AtomicBool>,
    open_calls: Arc<AtomicUsize>,
    last_url: Arc<Mutex<Option<String>>>,
    emitted: Arc<Mutex<Vec<EmittedEvent>>>,
}

impl MockTransport {
    /// Create a new mock transport (disconnected until `open`).
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(100);
        Self {
            events_tx,
            connected: Arc::new(AtomicBool::new(false)),
            refuse_connect: Arc::new(AtomicBool::new(false)),
            auto_ack: Arc::new(AtomicBool::new(false)),
            open_calls: Arc::new(AtomicUsize::new(0)),
            last_url: Arc::new(Mutex::new(None)),
            emitted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer every handshake with `handshake_ack`.
    pub fn auto_ack(self) -> Self {
        self.auto_ack.store(true, Ordering::SeqCst);
        self
    }

    /// Make subsequent `open` calls publish `ConnectError`.
    pub fn set_refuse_connect(&self, refuse: bool) {
        self.refuse_connect.store(refuse, Ordering::SeqCst);
    }

    /// Publish a server event to all subscribers.
    pub fn inject_event(&self, name: &str, payload: Value) {
        let _ = self.events_tx.send(TransportEvent::Event {
            name: name.to_string(),
            payload,
        });
    }

    /// Publish an arbitrary transport event.
    pub fn inject(&self, event: TransportEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Simulate the server dropping the connection.
    pub fn simulate_disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        let _ = self.events_tx.send(TransportEvent::Disconnected {
            reason: "transport close".to_string(),
        });
    }

    /// Simulate the transport reconnecting on its own.
    pub fn simulate_reconnect(&self) {
        self.connected.store(true, Ordering::SeqCst);
        let _ = self.events_tx.send(TransportEvent::Connected);
    }

    /// Everything emitted so far.
    pub fn emitted(&self) -> Vec<EmittedEvent> {
        self.emitted.lock().clone()
    }

    /// Emitted events with the given name.
    pub fn emitted_named(&self, name: &str) -> Vec<EmittedEvent> {
        self.emitted
            .lock()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    /// Number of times `open` was called.
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    /// URL passed to the most recent `open`.
    pub fn last_url(&self) -> Option<String> {
        self.last_url.lock().clone()
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.events_tx.receiver_count()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeTransport for MockTransport {
    async fn open(&self, url: &str) -> Result<(), TransportError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_url.lock() = Some(url.to_string());

        if self.refuse_connect.load(Ordering::SeqCst) {
            let _ = self.events_tx.send(TransportEvent::ConnectError {
                message: "connection refused".to_string(),
            });
            return Ok(());
        }
        if !self.connected.swap(true, Ordering::SeqCst) {
            let _ = self.events_tx.send(TransportEvent::Connected);
        }
        Ok(())
    }

    async fn emit(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        self.emitted.lock().push(EmittedEvent {
            name: event.to_string(),
            payload,
        });
        if event == events::HANDSHAKE && self.auto_ack.load(Ordering::SeqCst) {
            self.inject_event(events::HANDSHAKE_ACK, serde_json::json!({}));
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events_tx.subscribe()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            let _ = self.events_tx.send(TransportEvent::Disconnected {
                reason: "io client disconnect".to_string(),
            });
        }
    }
}
