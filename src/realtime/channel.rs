//! The realtime channel: connect, handshake, and route push events into the
//! sync engine.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::messages::{handshake_payload, ServerEvent};
use crate::auth::CredentialStore;
use crate::protocol::{events, is_all_marker};
use crate::sync::SyncEngine;
use crate::traits::{RealtimeTransport, TransportEvent};

/// Connection state as the channel sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Disconnected,
    Connecting,
    /// Open. `acknowledged` once the server answered the handshake.
    Connected { acknowledged: bool },
}

impl ChannelState {
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, ChannelState::Connected { acknowledged: true })
    }
}

struct ChannelInner {
    transport: Arc<dyn RealtimeTransport>,
    credentials: Arc<CredentialStore>,
    engine: Arc<SyncEngine>,
    state: Mutex<ChannelState>,
}

/// One long-lived realtime connection.
pub struct RealtimeChannel {
    inner: Arc<ChannelInner>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeChannel {
    pub fn new(
        transport: Arc<dyn RealtimeTransport>,
        credentials: Arc<CredentialStore>,
        engine: Arc<SyncEngine>,
    ) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                transport,
                credentials,
                engine,
                state: Mutex::new(ChannelState::Disconnected),
            }),
            listener: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ChannelState {
        *self.inner.state.lock()
    }

    /// Connected and acknowledged.
    pub fn is_connected(&self) -> bool {
        self.state().is_acknowledged() && self.inner.transport.is_connected()
    }

    /// Make sure a connection exists and is handshaken.
    ///
    /// Connected and acknowledged: nothing to do. Connected but never
    /// acknowledged: send the handshake again. Otherwise open the transport,
    /// even while `Connecting`: opening a transport that is still working on
    /// it is a no-op, and one whose worker stopped starts again.
    /// Returns false if the channel cannot connect (not configured, or the
    /// transport refused).
    pub async fn connect_if_needed(&self) -> bool {
        let Some(config) = self.inner.credentials.configuration() else {
            warn!("Realtime connect requested before configure");
            return false;
        };
        self.ensure_listener();

        let transport_open = self.inner.transport.is_connected();
        let state = self.state();
        match state {
            ChannelState::Connected { acknowledged: true } if transport_open => {
                debug!("Realtime channel already connected");
                true
            }
            ChannelState::Connected { acknowledged: false } if transport_open => {
                self.inner.send_handshake().await;
                true
            }
            _ => {
                *self.inner.state.lock() = ChannelState::Connecting;
                if state == ChannelState::Connecting {
                    debug!("Realtime channel still connecting, re-opening transport");
                } else {
                    info!("Opening realtime channel to {}", config.socket_url);
                }
                match self.inner.transport.open(&config.socket_url).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Realtime connect failed: {}", e);
                        *self.inner.state.lock() = ChannelState::Disconnected;
                        false
                    }
                }
            }
        }
    }

    /// Close the connection. The listener stays so a later connect works.
    pub async fn disconnect(&self) {
        info!("Closing realtime channel");
        self.inner.transport.close().await;
        *self.inner.state.lock() = ChannelState::Disconnected;
    }

    /// Close the connection and stop listening.
    pub async fn shutdown(&self) {
        self.disconnect().await;
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }

    fn ensure_listener(&self) {
        let mut listener = self.listener.lock();
        if listener.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        // Subscribe before opening so `Connected` cannot be missed.
        let mut rx = self.inner.transport.subscribe();
        let inner = self.inner.clone();
        *listener = Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => inner.handle(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Realtime listener lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => {
                        debug!("Realtime event stream closed");
                        break;
                    }
                }
            }
        }));
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }
}

impl ChannelInner {
    async fn handle(self: &Arc<Self>, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                info!("Realtime channel connected");
                *self.state.lock() = ChannelState::Connected {
                    acknowledged: false,
                };
                self.send_handshake().await;
            }
            TransportEvent::Disconnected { reason } => {
                info!("Realtime channel disconnected: {}", reason);
                *self.state.lock() = ChannelState::Disconnected;
            }
            TransportEvent::ConnectError { message } => {
                warn!("Realtime connect error: {}", message);
                *self.state.lock() = ChannelState::Disconnected;
            }
            TransportEvent::Event { name, payload } => match ServerEvent::parse(&name, &payload) {
                Ok(event) => self.handle_server_event(event),
                Err(e) => debug!("Ignoring realtime event: {}", e),
            },
        }
    }

    fn handle_server_event(self: &Arc<Self>, event: ServerEvent) {
        match event {
            ServerEvent::HandshakeAck => {
                {
                    let mut state = self.state.lock();
                    if !matches!(*state, ChannelState::Connected { .. }) {
                        debug!("Handshake ack while not connected, ignoring");
                        return;
                    }
                    *state = ChannelState::Connected { acknowledged: true };
                }
                info!("Handshake acknowledged");
                self.spawn_sync_all();
            }
            ServerEvent::TranslationsUpdated(name) => {
                debug!("Push: translations updated for {}", name);
                if is_all_marker(&name) {
                    self.spawn_sync_all();
                } else {
                    let engine = self.engine.clone();
                    tokio::spawn(async move {
                        engine.sync(&name).await;
                    });
                }
            }
            ServerEvent::DataStoreUpdated(identifier) => {
                debug!("Push: data store updated for {}", identifier);
                if is_all_marker(&identifier) {
                    self.spawn_sync_all();
                } else {
                    let engine = self.engine.clone();
                    tokio::spawn(async move {
                        engine.sync_store(&identifier).await;
                    });
                }
            }
        }
    }

    fn spawn_sync_all(&self) {
        let engine = self.engine.clone();
        tokio::spawn(async move {
            engine.sync_all().await;
        });
    }

    /// Encrypt and emit the handshake. Any failure leaves the channel
    /// unacknowledged.
    async fn send_handshake(&self) {
        let (Some(config), Some(key)) = (
            self.credentials.configuration(),
            self.credentials.symmetric_key(),
        ) else {
            warn!("Skipping handshake: no configuration or key");
            return;
        };

        let payload = match handshake_payload(&key, &config.project_id) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Skipping handshake: {}", e);
                return;
            }
        };

        match self.transport.emit(events::HANDSHAKE, payload).await {
            Ok(()) => debug!("Handshake sent for project {}", config.project_id),
            Err(e) => warn!("Failed to send handshake: {}", e),
        }
    }
}
