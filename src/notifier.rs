//! Conflated broadcast of content-update events.
//!
//! Built on a `watch` channel: publishing never blocks, slow subscribers only
//! see the latest event, and a new subscriber starts with the most recent
//! event pending.

use tokio::sync::watch;

use crate::protocol::{
    ALL_SCREENS_UPDATED, COLORS_COLLECTION, COLORS_UPDATED, IMAGES_COLLECTION, IMAGES_UPDATED,
};

/// Something in the cache changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    /// One translation collection changed.
    Collection(String),
    Colors,
    Images,
    /// One data store changed.
    Store(String),
    /// Everything may have changed (full sync, language switch).
    AllCollections,
}

impl UpdateEvent {
    /// Event for a synced collection name, mapping reserved collections.
    pub fn for_collection(name: &str) -> Self {
        match name {
            COLORS_COLLECTION => UpdateEvent::Colors,
            IMAGES_COLLECTION => UpdateEvent::Images,
            other => UpdateEvent::Collection(other.to_string()),
        }
    }

    /// Wire identifier of the event.
    pub fn identifier(&self) -> &str {
        match self {
            UpdateEvent::Collection(name) | UpdateEvent::Store(name) => name,
            UpdateEvent::Colors => COLORS_UPDATED,
            UpdateEvent::Images => IMAGES_UPDATED,
            UpdateEvent::AllCollections => ALL_SCREENS_UPDATED,
        }
    }

    /// Whether a consumer bound to `collection` should refresh.
    pub fn affects(&self, collection: &str) -> bool {
        match self {
            UpdateEvent::AllCollections => true,
            UpdateEvent::Colors => collection == COLORS_COLLECTION,
            UpdateEvent::Images => collection == IMAGES_COLLECTION,
            UpdateEvent::Collection(name) | UpdateEvent::Store(name) => name == collection,
        }
    }
}

impl std::fmt::Display for UpdateEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Publisher side.
#[derive(Debug)]
pub struct UpdateNotifier {
    tx: watch::Sender<Option<UpdateEvent>>,
}

impl Default for UpdateNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateNotifier {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Publish an event. Never blocks, succeeds with zero subscribers.
    pub fn emit(&self, event: UpdateEvent) {
        self.tx.send_replace(Some(event));
    }

    /// Attach a subscriber. Dropping the subscription unsubscribes.
    pub fn subscribe(&self) -> Subscription {
        let rx = self.tx.subscribe();
        let pending = rx.borrow().clone();
        Subscription { rx, pending }
    }

    /// Most recent event, if any.
    pub fn latest(&self) -> Option<UpdateEvent> {
        self.tx.borrow().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Receiver side.
#[derive(Debug)]
pub struct Subscription {
    rx: watch::Receiver<Option<UpdateEvent>>,
    pending: Option<UpdateEvent>,
}

impl Subscription {
    /// Wait for the next event. Returns `None` once the notifier is gone.
    pub async fn recv(&mut self) -> Option<UpdateEvent> {
        if let Some(event) = self.pending.take() {
            return Some(event);
        }
        loop {
            self.rx.changed().await.ok()?;
            if let Some(event) = self.rx.borrow_and_update().clone() {
                return Some(event);
            }
        }
    }

    /// Take the pending event without waiting.
    pub fn try_recv(&mut self) -> Option<UpdateEvent> {
        if let Some(event) = self.pending.take() {
            return Some(event);
        }
        match self.rx.has_changed() {
            Ok(true) => self.rx.borrow_and_update().clone(),
            _ => None,
        }
    }
}
