//! Observer registry for booking-table changes.
//!
//! Stores publish one [`BookingChange`] per written row. Listeners are plain
//! callbacks; they must not block, so anything slow should be handed off to a
//! task (see [`crate::watcher::StatusWatcher`]).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingChange {
    pub kind: ChangeKind,
    pub booking_id: Option<Uuid>,
}

impl BookingChange {
    pub fn new(kind: ChangeKind, booking_id: Uuid) -> Self {
        Self { kind, booking_id: Some(booking_id) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&BookingChange) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    listeners: RwLock<BTreeMap<ListenerId, Listener>>,
}

/// Shared handle; clones see the same listeners.
#[derive(Clone, Default)]
pub struct ChangeFeed {
    inner: Arc<Registry>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&BookingChange) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.write().insert(id, Arc::new(listener));
        tracing::debug!("Change listener {:?} registered", id);
        id
    }

    /// Returns `false` if the listener was already gone.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let removed = self.inner.listeners.write().remove(&id).is_some();
        if removed {
            tracing::debug!("Change listener {:?} unregistered", id);
        }
        removed
    }

    pub fn publish(&self, change: &BookingChange) {
        // Snapshot first so a listener may unregister itself without deadlocking.
        let listeners: Vec<Listener> = self.inner.listeners.read().values().cloned().collect();
        for listener in listeners {
            listener(change);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_listener_receives_every_kind() {
        let feed = ChangeFeed::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        feed.register(move |change| sink.lock().push(change.kind));

        let id = Uuid::new_v4();
        feed.publish(&BookingChange::new(ChangeKind::Insert, id));
        feed.publish(&BookingChange::new(ChangeKind::Update, id));
        feed.publish(&BookingChange::new(ChangeKind::Delete, id));

        assert_eq!(*seen.lock(), vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete]);
    }

    #[test]
    fn test_unregistered_listener_is_silent() {
        let feed = ChangeFeed::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let id = feed.register(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        feed.publish(&BookingChange::new(ChangeKind::Insert, Uuid::new_v4()));
        assert!(feed.unregister(id));
        assert!(!feed.unregister(id));
        feed.publish(&BookingChange::new(ChangeKind::Insert, Uuid::new_v4()));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(feed.listener_count(), 0);
    }

    #[test]
    fn test_clones_share_listeners() {
        let feed = ChangeFeed::new();
        let other = feed.clone();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        other.register(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        feed.publish(&BookingChange { kind: ChangeKind::Delete, booking_id: None });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
