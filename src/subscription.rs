//! Read-triggered discovery of the collections a host actually uses.
//!
//! The first read of an unseen collection or store claims it here; the caller
//! then schedules exactly one background sync for it.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
struct Claimed {
    collections: HashSet<String>,
    stores: HashSet<String>,
}

/// Tracks which collections and stores already had their lazy first sync.
#[derive(Debug, Default)]
pub struct AutoSubscriptionTracker {
    enabled: AtomicBool,
    claimed: Mutex<Claimed>,
}

impl AutoSubscriptionTracker {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            claimed: Mutex::new(Claimed::default()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Clear both sets and set whether tracking is on.
    pub fn reset(&self, enabled: bool) {
        let mut claimed = self.claimed.lock();
        claimed.collections.clear();
        claimed.stores.clear();
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Returns true exactly once per collection while enabled.
    pub fn claim_collection(&self, name: &str) -> bool {
        if !self.is_enabled() || name.is_empty() {
            return false;
        }
        self.claimed.lock().collections.insert(name.to_string())
    }

    /// Returns true exactly once per store while enabled.
    pub fn claim_store(&self, identifier: &str) -> bool {
        if !self.is_enabled() || identifier.is_empty() {
            return false;
        }
        self.claimed.lock().stores.insert(identifier.to_string())
    }

    /// Claimed collection count.
    pub fn claimed_collections(&self) -> usize {
        self.claimed.lock().collections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_claims_once() {
        let tracker = AutoSubscriptionTracker::new(true);
        assert!(tracker.claim_collection("home"));
        assert!(!tracker.claim_collection("home"));
        assert!(tracker.claim_store("home"));
        assert!(!tracker.claim_store("home"));
        assert!(!tracker.claim_collection(""));
    }

    #[test]
    fn test_disabled_never_claims() {
        let tracker = AutoSubscriptionTracker::new(false);
        assert!(!tracker.claim_collection("home"));
        assert!(!tracker.claim_store("products"));
        assert_eq!(tracker.claimed_collections(), 0);
    }

    #[test]
    fn test_reset_clears_claims() {
        let tracker = AutoSubscriptionTracker::new(true);
        tracker.claim_collection("home");
        tracker.reset(true);
        assert!(tracker.claim_collection("home"));

        tracker.reset(false);
        assert!(!tracker.is_enabled());
        assert_eq!(tracker.claimed_collections(), 0);
    }

    #[test]
    fn test_concurrent_claims_yield_one_winner() {
        let tracker = Arc::new(AutoSubscriptionTracker::new(true));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                std::thread::spawn(move || tracker.claim_collection("home"))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
