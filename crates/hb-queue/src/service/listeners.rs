//! Snapshot listener registry.

use crate::domain::QueueSnapshot;
use parking_lot::{Mutex, ReentrantMutex};
use std::cell::Cell;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Callback invoked with every queue snapshot.
pub type Listener = Arc<dyn Fn(&QueueSnapshot) + Send + Sync>;

/// Wraps a closure as a `Listener`.
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&QueueSnapshot) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A registered listener and the last revision it was handed.
pub(crate) struct ListenerSlot {
    id: Uuid,
    listener: Listener,
    delivered: ReentrantMutex<Cell<Option<u64>>>,
}

impl ListenerSlot {
    /// Calls the listener unless it already saw `snapshot.revision` or a
    /// newer one.
    ///
    /// Deliveries to one listener are serialized across threads. The guard is
    /// reentrant, so a listener that mutates the queue is handed the newer
    /// snapshot from inside its own callback.
    pub(crate) fn deliver(&self, snapshot: &QueueSnapshot) -> bool {
        let delivered = self.delivered.lock();
        if delivered.get().is_some_and(|seen| seen >= snapshot.revision) {
            return false;
        }
        delivered.set(Some(snapshot.revision));
        (self.listener)(snapshot);
        true
    }
}

type Entries = Mutex<Vec<Arc<ListenerSlot>>>;

/// Ordered set of listeners.
///
/// Listeners are invoked in registration order, outside the registry lock,
/// so a listener may subscribe or unsubscribe while being notified. Each
/// listener only ever sees increasing revisions.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    entries: Arc<Entries>,
}

impl ListenerRegistry {
    pub(crate) fn register(&self, listener: Listener) -> (ListenerHandle, Arc<ListenerSlot>) {
        let slot = Arc::new(ListenerSlot {
            id: Uuid::new_v4(),
            listener,
            delivered: ReentrantMutex::new(Cell::new(None)),
        });
        self.entries.lock().push(Arc::clone(&slot));
        let handle = ListenerHandle {
            id: slot.id,
            registry: Arc::downgrade(&self.entries),
        };
        (handle, slot)
    }

    pub(crate) fn notify(&self, snapshot: &QueueSnapshot) {
        let slots: Vec<Arc<ListenerSlot>> = self.entries.lock().iter().cloned().collect();
        for slot in slots {
            slot.deliver(snapshot);
        }
    }

    pub(crate) fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping the handle keeps the listener registered; call `unsubscribe`
/// to remove it.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    id: Uuid,
    registry: Weak<Entries>,
}

impl ListenerHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Removes the listener. Returns false if it was already removed or the
    /// service is gone.
    pub fn unsubscribe(self) -> bool {
        let Some(entries) = self.registry.upgrade() else {
            return false;
        };
        let mut entries = entries.lock();
        let before = entries.len();
        entries.retain(|slot| slot.id != self.id);
        entries.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QueueStats;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot() -> QueueSnapshot {
        snapshot_at(0)
    }

    fn snapshot_at(revision: u64) -> QueueSnapshot {
        QueueSnapshot {
            revision,
            entries: Vec::new(),
            stats: QueueStats::default(),
            taken_at: Utc::now(),
        }
    }

    fn counting(counter: &Arc<AtomicUsize>) -> Listener {
        let counter = Arc::clone(counter);
        Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_notify_calls_every_listener() {
        let registry = ListenerRegistry::default();
        let counter = Arc::new(AtomicUsize::new(0));
        let _a = registry.register(counting(&counter)).0;
        let _b = registry.register(counting(&counter)).0;

        registry.notify(&snapshot());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unsubscribe_removes_only_that_listener() {
        let registry = ListenerRegistry::default();
        let counter = Arc::new(AtomicUsize::new(0));
        let a = registry.register(counting(&counter)).0;
        let _b = registry.register(counting(&counter)).0;

        assert!(a.clone().unsubscribe());
        assert!(!a.unsubscribe());

        registry.notify(&snapshot());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropping_handle_keeps_listener() {
        let registry = ListenerRegistry::default();
        let counter = Arc::new(AtomicUsize::new(0));
        drop(registry.register(counting(&counter)).0);

        registry.notify(&snapshot());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_after_registry_dropped() {
        let registry = ListenerRegistry::default();
        let (handle, _) = registry.register(Arc::new(|_| {}));
        drop(registry);
        assert!(!handle.unsubscribe());
    }

    #[test]
    fn test_clear() {
        let registry = ListenerRegistry::default();
        let (handle, _) = registry.register(Arc::new(|_| {}));
        assert_eq!(registry.clear(), 1);
        assert_eq!(registry.len(), 0);
        assert!(!handle.unsubscribe());
    }

    #[test]
    fn test_stale_and_repeated_revisions_skipped() {
        let registry = ListenerRegistry::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _handle = registry.register(Arc::new(move |snapshot: &QueueSnapshot| {
            sink.lock().push(snapshot.revision);
        }));

        registry.notify(&snapshot_at(2));
        registry.notify(&snapshot_at(1));
        registry.notify(&snapshot_at(2));
        registry.notify(&snapshot_at(3));
        assert_eq!(*seen.lock(), vec![2, 3]);
    }

    #[test]
    fn test_nested_delivery_from_inside_callback() {
        let registry = Arc::new(ListenerRegistry::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let inner = Arc::downgrade(&registry);
        let _handle = registry.register(Arc::new(move |snapshot: &QueueSnapshot| {
            sink.lock().push(snapshot.revision);
            if snapshot.revision == 1 {
                if let Some(registry) = inner.upgrade() {
                    registry.notify(&snapshot_at(2));
                }
            }
        }));

        registry.notify(&snapshot_at(1));
        assert_eq!(*seen.lock(), vec![1, 2]);
    }
}
