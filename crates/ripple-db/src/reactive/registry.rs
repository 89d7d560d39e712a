//! Per-DAO listener registry.
//!
//! Delivery is a synchronous fan-out over a snapshot of the entry list:
//!   - A listener removed *during* a delivery round is still skipped for
//!     the rest of that round (the per-entry detached flag is checked at
//!     delivery time, not snapshot time).
//!   - A listener added *during* a delivery round is not called until the
//!     next round.
//! The lock is never held while a sink runs, so listeners may subscribe
//! or detach from inside their own callbacks.
//!
//! A delivery that returns `Err` detaches the offending listener and is
//! logged; it never interrupts delivery to the remaining listeners.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::event::DaoEvent;
use crate::sink::Sink;

/// Handle for a live registration, revocable exactly once.
pub trait Detachable: Send + Sync {
    /// Stop all further delivery. Idempotent.
    fn detach(&self);
}

/// A detachable subscription handle returned by `listen`.
///
/// Dropping the handle does not detach; the registration lives until
/// `detach()` is called or the owning DAO is dropped.
#[derive(Clone)]
pub struct Subscription(Arc<dyn Detachable>);

impl Subscription {
    pub fn new(inner: impl Detachable + 'static) -> Self {
        Self(Arc::new(inner))
    }

    /// Wrap an already-shared detach state.
    pub fn from_arc(inner: Arc<dyn Detachable>) -> Self {
        Self(inner)
    }

    pub fn detach(&self) {
        self.0.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Subscription")
    }
}

// ============================================================================
// Registry internals
// ============================================================================

struct ListenerEntry {
    id: u64,
    sink: Arc<dyn Sink>,
    detached: AtomicBool,
}

impl ListenerEntry {
    fn deliver(&self, event: &DaoEvent) -> crate::error::Result<()> {
        match event {
            DaoEvent::Put(v) => self.sink.put(v),
            DaoEvent::Remove(v) => self.sink.remove(v),
            DaoEvent::Reset => self.sink.reset(),
        }
    }
}

struct RegistrySubscription {
    entry: Arc<ListenerEntry>,
    registry: Weak<ListenerRegistry>,
}

impl Detachable for RegistrySubscription {
    fn detach(&self) {
        if self.entry.detached.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.entry.id);
        }
    }
}

// ============================================================================
// ListenerRegistry
// ============================================================================

/// Registry of active listener sinks for one DAO.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: Mutex<Vec<Arc<ListenerEntry>>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `sink` and return its subscription handle.
    pub fn subscribe(self: &Arc<Self>, sink: Arc<dyn Sink>) -> Subscription {
        let entry = Arc::new(ListenerEntry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            sink,
            detached: AtomicBool::new(false),
        });
        self.entries.lock().push(Arc::clone(&entry));
        Subscription::new(RegistrySubscription {
            entry,
            registry: Arc::downgrade(self),
        })
    }

    fn remove(&self, id: u64) {
        self.entries.lock().retain(|e| e.id != id);
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Deliver `event` to every listener registered before this call, in
    /// registration order.
    pub fn publish(&self, event: &DaoEvent) {
        let snapshot: Vec<Arc<ListenerEntry>> = self.entries.lock().clone();

        for entry in snapshot {
            if entry.detached.load(Ordering::SeqCst) {
                continue;
            }
            if let Err(err) = entry.deliver(event) {
                tracing::warn!(
                    listener = entry.id,
                    error = %err,
                    "listener failed during delivery; detaching it"
                );
                entry.detached.store(true, Ordering::SeqCst);
                self.remove(entry.id);
            }
        }
    }
}
