//! Transparent delegation with a swappable delegate.
//!
//! All core operations forward to the current delegate. Swapping the
//! delegate re-attaches every live subscription to the new delegate —
//! with the predicate and context it was originally given — and emits one
//! `reset` downstream so consumers re-read.
//!
//! The delegate pointer sits behind a `parking_lot::RwLock`; the `Arc` is
//! cloned out before any `.await` so the guard never crosses a suspension
//! point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::context::Context;
use crate::error::Result;
use crate::query::predicate::Predicate;
use crate::query::spec::QuerySpec;
use crate::reactive::registry::{Detachable, Subscription};
use crate::schema::RecordClass;
use crate::sink::Sink;

use super::base::{answer_kind, next_uid};
use super::{Command, CmdOutcome, Dao};

// ============================================================================
// ProxyListener
// ============================================================================

/// Forwarding sink standing between a delegate's registry and one of the
/// proxy's subscribers. It survives delegate swaps: the proxy detaches
/// its inner registration from the old delegate and re-listens on the
/// new one, keeping this forwarder (and the consumer behind it) intact.
struct ProxyListener {
    context: Context,
    sink: Arc<dyn Sink>,
    predicate: Option<Arc<dyn Predicate>>,
    inner: Mutex<Option<Subscription>>,
    detached: AtomicBool,
}

impl ProxyListener {
    fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    fn drop_inner(&self) {
        if let Some(sub) = self.inner.lock().take() {
            sub.detach();
        }
    }
}

impl Sink for ProxyListener {
    fn put(&self, record: &Value) -> Result<()> {
        if self.is_detached() {
            return Ok(());
        }
        self.sink.put(record)
    }

    fn remove(&self, record: &Value) -> Result<()> {
        if self.is_detached() {
            return Ok(());
        }
        self.sink.remove(record)
    }

    fn reset(&self) -> Result<()> {
        if self.is_detached() {
            return Ok(());
        }
        self.sink.reset()
    }

    fn accepts_ordering(&self) -> bool {
        self.sink.accepts_ordering()
    }
}

struct ProxySubscription {
    listener: Arc<ProxyListener>,
}

impl Detachable for ProxySubscription {
    fn detach(&self) {
        if self.listener.detached.swap(true, Ordering::SeqCst) {
            return;
        }
        self.listener.drop_inner();
    }
}

// ============================================================================
// ProxyDao
// ============================================================================

/// Forwards every operation to a swappable delegate.
pub struct ProxyDao {
    uid: u64,
    of_override: Option<Arc<RecordClass>>,
    delegate: RwLock<Arc<dyn Dao>>,
    listeners: Mutex<Vec<Arc<ProxyListener>>>,
}

impl ProxyDao {
    pub fn new(delegate: Arc<dyn Dao>) -> Self {
        Self {
            uid: next_uid(),
            of_override: None,
            delegate: RwLock::new(delegate),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Pin `of` instead of deriving it from the delegate.
    pub fn with_of(mut self, of: Arc<RecordClass>) -> Self {
        self.of_override = Some(of);
        self
    }

    /// The delegate at this moment.
    pub fn delegate(&self) -> Arc<dyn Dao> {
        Arc::clone(&self.delegate.read())
    }

    /// Replace the delegate.
    ///
    /// Live subscriptions are detached from the old delegate, re-attached
    /// to the new one with their original predicate and context, and each
    /// receives exactly one `reset`. Operations issued after this returns
    /// reach only the new delegate.
    pub fn set_delegate(&self, new_delegate: Arc<dyn Dao>) {
        {
            let mut guard = self.delegate.write();
            *guard = Arc::clone(&new_delegate);
        }
        tracing::debug!(dao = "ripple.dao.ProxyDao", "delegate replaced");

        let live: Vec<Arc<ProxyListener>> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|l| !l.is_detached());
            listeners.clone()
        };

        for listener in live {
            listener.drop_inner();
            if listener.is_detached() {
                continue;
            }
            match new_delegate.listen(
                &listener.context,
                Arc::clone(&listener) as Arc<dyn Sink>,
                listener.predicate.clone(),
            ) {
                Ok(sub) => {
                    *listener.inner.lock() = Some(sub);
                    // A detach racing the re-attach wins.
                    if listener.is_detached() {
                        listener.drop_inner();
                        continue;
                    }
                    if let Err(err) = listener.sink.reset() {
                        tracing::warn!(
                            error = %err,
                            "subscriber failed on delegate-swap reset; detaching it"
                        );
                        listener.detached.store(true, Ordering::SeqCst);
                        listener.drop_inner();
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "re-attaching subscriber to new delegate failed");
                }
            }
        }
    }
}

#[async_trait]
impl Dao for ProxyDao {
    fn of(&self) -> Arc<RecordClass> {
        match &self.of_override {
            Some(of) => Arc::clone(of),
            None => self.delegate().of(),
        }
    }

    fn uid(&self) -> u64 {
        self.uid
    }

    fn kind(&self) -> &'static str {
        "ripple.dao.ProxyDao"
    }

    async fn put(&self, x: &Context, record: Value) -> Result<Value> {
        self.delegate().put(x, record).await
    }

    async fn remove(&self, x: &Context, record: Value) -> Result<()> {
        self.delegate().remove(x, record).await
    }

    async fn find(&self, x: &Context, id: &Value) -> Result<Option<Value>> {
        self.delegate().find(x, id).await
    }

    async fn select(&self, x: &Context, sink: Arc<dyn Sink>, spec: QuerySpec) -> Result<()> {
        self.delegate().select(x, sink, spec).await
    }

    async fn remove_all(&self, x: &Context, spec: QuerySpec) -> Result<()> {
        self.delegate().remove_all(x, spec).await
    }

    fn listen(
        &self,
        x: &Context,
        sink: Arc<dyn Sink>,
        predicate: Option<Arc<dyn Predicate>>,
    ) -> Result<Subscription> {
        let listener = Arc::new(ProxyListener {
            context: x.clone(),
            sink,
            predicate,
            inner: Mutex::new(None),
            detached: AtomicBool::new(false),
        });

        let sub = self.delegate().listen(
            x,
            Arc::clone(&listener) as Arc<dyn Sink>,
            listener.predicate.clone(),
        )?;
        *listener.inner.lock() = Some(sub);

        {
            let mut listeners = self.listeners.lock();
            listeners.retain(|l| !l.is_detached());
            listeners.push(Arc::clone(&listener));
        }

        Ok(Subscription::new(ProxySubscription { listener }))
    }

    async fn cmd(&self, x: &Context, cmd: &Command) -> CmdOutcome {
        match answer_kind(self.kind(), cmd) {
            CmdOutcome::NotHandled => self.delegate().cmd(x, cmd).await,
            handled => handled,
        }
    }
}
