//! Socket.IO realtime transport over tokio-tungstenite.
//!
//! A background task owns the WebSocket. It joins the default namespace,
//! answers heartbeats, forwards server events to subscribers, and reconnects
//! with exponential backoff when the connection drops. `close` waits for that
//! task to finish, so a following `open` always starts a fresh one.

pub mod packet;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::traits::{RealtimeTransport, TransportError, TransportEvent};

pub use packet::{engine_url, Packet};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Reconnection settings.
#[derive(Debug, Clone)]
pub struct SocketIoConfig {
    /// Consecutive failed attempts before giving up. A later `open` restarts.
    pub max_retries: u8,
    pub max_backoff_secs: u64,
}

impl Default for SocketIoConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            max_backoff_secs: 30,
        }
    }
}

/// How long `close` waits for the worker before aborting it.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Backoff before reconnection attempt `attempt` (1-based): 1s, 2s, 4s, ...
/// capped at `max_backoff_secs`.
pub fn backoff_delay(attempt: u8, max_backoff_secs: u64) -> Duration {
    let shift = u32::from(attempt.saturating_sub(1)).min(16);
    Duration::from_secs(std::cmp::min(1u64 << shift, max_backoff_secs))
}

enum Command {
    Send(String),
    Close,
}

/// Socket.IO transport using tokio-tungstenite.
///
/// # Example
///
/// ```ignore
/// use cure_sync::adapters::SocketIoTransport;
/// use cure_sync::traits::RealtimeTransport;
///
/// let transport = SocketIoTransport::new();
/// let mut events = transport.subscribe();
/// transport.open("wss://app.cmscure.com").await?;
/// ```
pub struct SocketIoTransport {
    config: SocketIoConfig,
    events_tx: broadcast::Sender<TransportEvent>,
    command_tx: Arc<Mutex<Option<mpsc::Sender<Command>>>>,
    connected: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SocketIoTransport {
    /// Create a transport with default reconnection settings.
    pub fn new() -> Self {
        Self::with_config(SocketIoConfig::default())
    }

    /// Create a transport with custom reconnection settings.
    pub fn with_config(config: SocketIoConfig) -> Self {
        let (events_tx, _) = broadcast::channel(100);
        Self {
            config,
            events_tx,
            command_tx: Arc::new(Mutex::new(None)),
            connected: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    fn sender(&self) -> Option<mpsc::Sender<Command>> {
        self.command_tx.lock().clone()
    }

    /// Whether a connection worker is alive (connected, connecting, or
    /// backing off between attempts).
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Default for SocketIoTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeTransport for SocketIoTransport {
    async fn open(&self, url: &str) -> Result<(), TransportError> {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Socket.IO transport already running");
            return Ok(());
        }
        self.shutdown.store(false, Ordering::SeqCst);

        let (command_tx, command_rx) = mpsc::channel::<Command>(100);
        *self.command_tx.lock() = Some(command_tx);

        let worker = ConnectionWorker {
            url: engine_url(url),
            config: self.config.clone(),
            events_tx: self.events_tx.clone(),
            connected: self.connected.clone(),
            shutdown: self.shutdown.clone(),
        };
        let running = self.running.clone();
        let command_slot = self.command_tx.clone();

        let handle = tokio::spawn(async move {
            worker.run(command_rx).await;
            *command_slot.lock() = None;
            running.store(false, Ordering::SeqCst);
        });
        *self.worker.lock() = Some(handle);

        Ok(())
    }

    async fn emit(&self, event: &str, payload: Value) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        let sender = self.sender().ok_or(TransportError::Disconnected)?;
        sender
            .send(Command::Send(Packet::event(event, payload).encode()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.events_tx.subscribe()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        info!("Closing Socket.IO transport");
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(sender) = self.sender() {
            let _ = sender.send(Command::Close).await;
        }

        let worker = self.worker.lock().take();
        if let Some(mut handle) = worker {
            if tokio::time::timeout(CLOSE_GRACE, &mut handle).await.is_err() {
                warn!("Socket.IO worker did not stop in time, aborting it");
                handle.abort();
                let _ = handle.await;
            }
        }

        // An aborted worker never ran its own cleanup.
        *self.command_tx.lock() = None;
        self.connected.store(false, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for SocketIoTransport {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

struct ConnectionWorker {
    url: String,
    config: SocketIoConfig,
    events_tx: broadcast::Sender<TransportEvent>,
    connected: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
}

impl ConnectionWorker {
    fn publish(&self, event: TransportEvent) {
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }

    /// Connect, run sessions, and reconnect until shut down or out of retries.
    async fn run(&self, mut command_rx: mpsc::Receiver<Command>) {
        let mut attempt: u8 = 0;

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            match connect_async(self.url.as_str()).await {
                Ok((ws, _)) => {
                    info!("Connected to Socket.IO endpoint {}", self.url);
                    attempt = 0;
                    let reason = self.run_session(ws, &mut command_rx).await;
                    let was_connected = self.connected.swap(false, Ordering::SeqCst);
                    if was_connected {
                        self.publish(TransportEvent::Disconnected {
                            reason: reason.clone(),
                        });
                    }
                    info!("Socket.IO session ended: {}", reason);
                }
                Err(e) => {
                    warn!("Socket.IO connect failed: {}", e);
                    self.publish(TransportEvent::ConnectError {
                        message: e.to_string(),
                    });
                }
            }

            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            attempt = attempt.saturating_add(1);
            if attempt > self.config.max_retries {
                error!(
                    "Failed to reconnect after {} attempts, giving up",
                    self.config.max_retries
                );
                break;
            }

            let delay = backoff_delay(attempt, self.config.max_backoff_secs);
            info!(
                "Reconnection attempt {} of {}, waiting {}s",
                attempt,
                self.config.max_retries,
                delay.as_secs()
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                command = command_rx.recv() => {
                    if matches!(command, Some(Command::Close) | None) {
                        break;
                    }
                }
            }
        }

        self.connected.store(false, Ordering::SeqCst);
        debug!("Socket.IO connection loop ended");
    }

    /// Drive one WebSocket session. Returns the disconnect reason.
    async fn run_session(&self, ws: WsStream, command_rx: &mut mpsc::Receiver<Command>) -> String {
        let (mut sink, mut stream) = ws.split();

        loop {
            tokio::select! {
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match Packet::decode(&text) {
                                Ok(Packet::Open(_)) => {
                                    debug!("Engine.IO open, joining namespace");
                                    if let Err(e) = sink.send(Message::Text(Packet::Connect(None).encode())).await {
                                        return format!("send failed: {}", e);
                                    }
                                }
                                Ok(Packet::Connect(_)) => {
                                    self.connected.store(true, Ordering::SeqCst);
                                    self.publish(TransportEvent::Connected);
                                }
                                Ok(Packet::Ping) => {
                                    if let Err(e) = sink.send(Message::Text(Packet::Pong.encode())).await {
                                        return format!("send failed: {}", e);
                                    }
                                }
                                Ok(Packet::Event { name, payload }) => {
                                    debug!("Received event '{}'", name);
                                    self.publish(TransportEvent::Event { name, payload });
                                }
                                Ok(Packet::ConnectError(data)) => {
                                    self.publish(TransportEvent::ConnectError {
                                        message: data.to_string(),
                                    });
                                    return "namespace connect refused".to_string();
                                }
                                Ok(Packet::Disconnect) | Ok(Packet::Close) => {
                                    return "io server disconnect".to_string();
                                }
                                Ok(Packet::Pong) | Ok(Packet::Noop) => {}
                                Err(e) => {
                                    // Skip malformed frames without dropping the session.
                                    warn!("Ignoring frame: {} - {}", e, text);
                                }
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = sink.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(_))) => {
                            return "transport close".to_string();
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!("WebSocket error: {}", e);
                            return format!("transport error: {}", e);
                        }
                        None => {
                            return "transport close".to_string();
                        }
                    }
                }
                command = command_rx.recv() => {
                    match command {
                        Some(Command::Send(text)) => {
                            if let Err(e) = sink.send(Message::Text(text)).await {
                                error!("Failed to send frame: {}", e);
                            }
                        }
                        Some(Command::Close) | None => {
                            let _ = sink.send(Message::Text(Packet::Disconnect.encode())).await;
                            let _ = sink.close().await;
                            return "io client disconnect".to_string();
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(1, 30), Duration::from_secs(1));
        assert_eq!(backoff_delay(2, 30), Duration::from_secs(2));
        assert_eq!(backoff_delay(3, 30), Duration::from_secs(4));
        assert_eq!(backoff_delay(5, 30), Duration::from_secs(16));
        assert_eq!(backoff_delay(6, 30), Duration::from_secs(30));
        assert_eq!(backoff_delay(200, 30), Duration::from_secs(30));
    }

    #[test]
    fn test_config_default() {
        let config = SocketIoConfig::default();
        assert_eq!(config.max_retries, 10);
        assert_eq!(config.max_backoff_secs, 30);
    }

    #[tokio::test]
    async fn test_emit_while_disconnected_fails() {
        let transport = SocketIoTransport::new();
        let result = transport.emit("handshake", serde_json::json!({})).await;
        assert!(matches!(result, Err(TransportError::Disconnected)));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let transport = SocketIoTransport::with_config(SocketIoConfig {
            max_retries: 0,
            max_backoff_secs: 1,
        });
        let mut rx = transport.subscribe();

        transport.open("ws://127.0.0.1:59998").await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, TransportEvent::ConnectError { .. }));
        assert!(!transport.is_connected());
    }

    /// URL of a local port with nothing listening on it.
    fn refused_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("ws://127.0.0.1:{}", port)
    }

    async fn next_connect_error(rx: &mut broadcast::Receiver<TransportEvent>) {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("no transport event in time")
                .unwrap();
            if matches!(event, TransportEvent::ConnectError { .. }) {
                return;
            }
        }
    }

    #[tokio::test]
    async fn test_close_stops_worker_and_reopen_starts_fresh() {
        let transport = SocketIoTransport::new();
        let url = refused_url();
        let mut rx = transport.subscribe();

        transport.open(&url).await.unwrap();
        next_connect_error(&mut rx).await;
        assert!(transport.is_running());

        // The worker is sleeping in backoff; close must not leave it behind.
        transport.close().await;
        assert!(!transport.is_running());

        transport.open(&url).await.unwrap();
        assert!(transport.is_running());
        next_connect_error(&mut rx).await;

        transport.close().await;
        assert!(!transport.is_running());
    }
}
