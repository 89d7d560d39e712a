//! Shared plumbing for concrete DAOs.
//!
//! [`DaoCore`] bundles what every leaf store needs: a creation-ordered
//! uid, the listener registry, and publish helpers. Decorators and
//! proxies, which forward `listen` to a delegate, allocate just a uid via
//! [`next_uid`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::context::Context;
use crate::error::Result;
use crate::query::predicate::Predicate;
use crate::query::spec::QuerySpec;
use crate::reactive::event::DaoEvent;
use crate::reactive::registry::{ListenerRegistry, Subscription};
use crate::sink::{ArraySink, Sink};

use super::{Command, CmdOutcome, Dao};

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// Allocate a creation-ordered DAO identity.
pub fn next_uid() -> u64 {
    NEXT_UID.fetch_add(1, Ordering::Relaxed)
}

// ============================================================================
// ResetListener
// ============================================================================

/// Collapses every mutation to a `reset`.
///
/// Used when a listener supplies a predicate: instead of tracking
/// predicate membership across arbitrary mutations, consumers are told to
/// re-read. Precision is traded for consistency.
pub struct ResetListener {
    delegate: Arc<dyn Sink>,
}

impl ResetListener {
    pub fn new(delegate: Arc<dyn Sink>) -> Self {
        Self { delegate }
    }
}

impl Sink for ResetListener {
    fn put(&self, _record: &Value) -> Result<()> {
        self.delegate.reset()
    }

    fn remove(&self, _record: &Value) -> Result<()> {
        self.delegate.reset()
    }

    fn reset(&self) -> Result<()> {
        self.delegate.reset()
    }

    fn accepts_ordering(&self) -> bool {
        self.delegate.accepts_ordering()
    }
}

/// Decorate a listener sink for registration.
///
/// A supplied predicate collapses delivery to resets, unless it partially
/// evaluates to a universal truth (then it is no predicate at all).
pub fn decorate_listener(
    sink: Arc<dyn Sink>,
    predicate: Option<&Arc<dyn Predicate>>,
) -> Arc<dyn Sink> {
    match predicate {
        Some(p) => {
            let p = p.partial_eval().unwrap_or_else(|| Arc::clone(p));
            if p.always_true() {
                sink
            } else {
                Arc::new(ResetListener::new(sink))
            }
        }
        None => sink,
    }
}

// ============================================================================
// DaoCore
// ============================================================================

/// Identity, listener registry, and publish helpers for a leaf store.
pub struct DaoCore {
    uid: u64,
    registry: Arc<ListenerRegistry>,
}

impl DaoCore {
    pub fn new() -> Self {
        Self {
            uid: next_uid(),
            registry: ListenerRegistry::new(),
        }
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    /// Register a listener, applying [`decorate_listener`].
    pub fn listen(
        &self,
        sink: Arc<dyn Sink>,
        predicate: Option<Arc<dyn Predicate>>,
    ) -> Result<Subscription> {
        let sink = decorate_listener(sink, predicate.as_ref());
        Ok(self.registry.subscribe(sink))
    }

    pub fn notify_put(&self, record: &Value) {
        self.registry.publish(&DaoEvent::Put(record.clone()));
    }

    pub fn notify_remove(&self, record: &Value) {
        self.registry.publish(&DaoEvent::Remove(record.clone()));
    }

    pub fn notify_reset(&self) {
        self.registry.publish(&DaoEvent::Reset);
    }
}

impl Default for DaoCore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Shared algorithms
// ============================================================================

/// Answer the kind query against `kind`; everything else is unhandled.
pub fn answer_kind(kind: &str, cmd: &Command) -> CmdOutcome {
    match cmd {
        Command::IsKind { name } if name == kind => CmdOutcome::Handled(Value::Bool(true)),
        _ => CmdOutcome::NotHandled,
    }
}

/// Default `remove_all`: select the matching set, then remove each record
/// through the DAO so every deletion is published normally.
pub async fn remove_all_via_select(dao: &dyn Dao, x: &Context, spec: QuerySpec) -> Result<()> {
    let buffer = Arc::new(ArraySink::new());
    dao.select(x, Arc::clone(&buffer) as Arc<dyn Sink>, spec)
        .await?;
    for record in buffer.take() {
        dao.remove(x, record).await?;
    }
    Ok(())
}
