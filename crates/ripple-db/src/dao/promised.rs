//! Deferred-delegate DAO.
//!
//! A [`PromisedDao`] stands in for a backing store that becomes available
//! only after an asynchronous operation completes. Operations issued
//! before [`PromisedDao::resolve`] enqueue a pending entry with a oneshot
//! reply channel and await it; resolution drains the queue exactly once,
//! in issuance order. Operations arriving while the drain is in flight
//! keep queuing behind it so nothing overtakes an earlier call; only once
//! the queue runs dry do calls go straight to the delegate.
//!
//! `listen` returns its handle immediately even before resolution;
//! `detach()` on that handle is safe at any point — before resolution it
//! cancels the pending registration, during it the race is re-checked
//! after attach, after it the inner subscription is detached.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::context::Context;
use crate::error::{DaoError, Result};
use crate::query::predicate::Predicate;
use crate::query::spec::QuerySpec;
use crate::reactive::registry::{Detachable, Subscription};
use crate::schema::RecordClass;
use crate::sink::Sink;

use super::base::{answer_kind, next_uid};
use super::{Command, CmdOutcome, Dao};

// ============================================================================
// Pending operations
// ============================================================================

enum QueuedOp {
    Put {
        x: Context,
        record: Value,
        reply: oneshot::Sender<Result<Value>>,
    },
    Remove {
        x: Context,
        record: Value,
        reply: oneshot::Sender<Result<()>>,
    },
    Find {
        x: Context,
        id: Value,
        reply: oneshot::Sender<Result<Option<Value>>>,
    },
    Select {
        x: Context,
        sink: Arc<dyn Sink>,
        spec: QuerySpec,
        reply: oneshot::Sender<Result<()>>,
    },
    RemoveAll {
        x: Context,
        spec: QuerySpec,
        reply: oneshot::Sender<Result<()>>,
    },
    Cmd {
        x: Context,
        cmd: Command,
        reply: oneshot::Sender<CmdOutcome>,
    },
    Listen {
        x: Context,
        sink: Arc<dyn Sink>,
        predicate: Option<Arc<dyn Predicate>>,
        handle: Arc<PendingListen>,
    },
}

/// Shared state behind a subscription handed out before resolution.
struct PendingListen {
    cancelled: AtomicBool,
    inner: Mutex<Option<Subscription>>,
}

impl Detachable for PendingListen {
    fn detach(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(sub) = self.inner.lock().take() {
            sub.detach();
        }
    }
}

// ============================================================================
// PromisedDao
// ============================================================================

struct PromiseState {
    resolved: Option<Arc<dyn Dao>>,
    draining: bool,
    queue: Vec<QueuedOp>,
}

/// DAO whose delegate arrives later.
pub struct PromisedDao {
    uid: u64,
    of: Arc<RecordClass>,
    state: Mutex<PromiseState>,
}

/// Either the resolved delegate (fast path) or a queued reply to await.
enum Gate<T> {
    Direct(Arc<dyn Dao>),
    Queued(oneshot::Receiver<T>),
}

impl PromisedDao {
    pub fn new(of: Arc<RecordClass>) -> Self {
        Self {
            uid: next_uid(),
            of,
            state: Mutex::new(PromiseState {
                resolved: None,
                draining: false,
                queue: Vec::new(),
            }),
        }
    }

    /// Bind the delegate and replay every queued operation in issuance
    /// order. Resolving twice is an error.
    pub async fn resolve(&self, delegate: Arc<dyn Dao>) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.resolved.is_some() {
                return Err(DaoError::AlreadyResolved);
            }
            state.resolved = Some(Arc::clone(&delegate));
            state.draining = true;
        }
        tracing::debug!(class = self.of.name(), "deferred delegate resolved");

        loop {
            let batch = {
                let mut state = self.state.lock();
                if state.queue.is_empty() {
                    state.draining = false;
                    return Ok(());
                }
                std::mem::take(&mut state.queue)
            };
            for op in batch {
                Self::run_queued(&delegate, op).await;
            }
        }
    }

    async fn run_queued(delegate: &Arc<dyn Dao>, op: QueuedOp) {
        match op {
            QueuedOp::Put { x, record, reply } => {
                let _ = reply.send(delegate.put(&x, record).await);
            }
            QueuedOp::Remove { x, record, reply } => {
                let _ = reply.send(delegate.remove(&x, record).await);
            }
            QueuedOp::Find { x, id, reply } => {
                let _ = reply.send(delegate.find(&x, &id).await);
            }
            QueuedOp::Select {
                x,
                sink,
                spec,
                reply,
            } => {
                let _ = reply.send(delegate.select(&x, sink, spec).await);
            }
            QueuedOp::RemoveAll { x, spec, reply } => {
                let _ = reply.send(delegate.remove_all(&x, spec).await);
            }
            QueuedOp::Cmd { x, cmd, reply } => {
                let _ = reply.send(delegate.cmd(&x, &cmd).await);
            }
            QueuedOp::Listen {
                x,
                sink,
                predicate,
                handle,
            } => {
                if handle.cancelled.load(Ordering::SeqCst) {
                    return;
                }
                match delegate.listen(&x, sink, predicate) {
                    Ok(sub) => {
                        *handle.inner.lock() = Some(sub);
                        // A detach racing the attach wins.
                        if handle.cancelled.load(Ordering::SeqCst) {
                            if let Some(sub) = handle.inner.lock().take() {
                                sub.detach();
                            }
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "queued listen failed after resolution");
                    }
                }
            }
        }
    }

    /// Take the fast path when resolved and idle, otherwise queue `op`.
    fn gate<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> QueuedOp) -> Gate<T> {
        let mut state = self.state.lock();
        if let Some(delegate) = &state.resolved {
            if !state.draining && state.queue.is_empty() {
                return Gate::Direct(Arc::clone(delegate));
            }
        }
        let (tx, rx) = oneshot::channel();
        state.queue.push(make(tx));
        Gate::Queued(rx)
    }
}

#[async_trait]
impl Dao for PromisedDao {
    fn of(&self) -> Arc<RecordClass> {
        Arc::clone(&self.of)
    }

    fn uid(&self) -> u64 {
        self.uid
    }

    fn kind(&self) -> &'static str {
        "ripple.dao.PromisedDao"
    }

    async fn put(&self, x: &Context, record: Value) -> Result<Value> {
        match self.gate(|reply| QueuedOp::Put {
            x: x.clone(),
            record: record.clone(),
            reply,
        }) {
            Gate::Direct(delegate) => delegate.put(x, record).await,
            Gate::Queued(rx) => rx.await.map_err(|_| DaoError::PromiseDropped)?,
        }
    }

    async fn remove(&self, x: &Context, record: Value) -> Result<()> {
        match self.gate(|reply| QueuedOp::Remove {
            x: x.clone(),
            record: record.clone(),
            reply,
        }) {
            Gate::Direct(delegate) => delegate.remove(x, record).await,
            Gate::Queued(rx) => rx.await.map_err(|_| DaoError::PromiseDropped)?,
        }
    }

    async fn find(&self, x: &Context, id: &Value) -> Result<Option<Value>> {
        match self.gate(|reply| QueuedOp::Find {
            x: x.clone(),
            id: id.clone(),
            reply,
        }) {
            Gate::Direct(delegate) => delegate.find(x, id).await,
            Gate::Queued(rx) => rx.await.map_err(|_| DaoError::PromiseDropped)?,
        }
    }

    async fn select(&self, x: &Context, sink: Arc<dyn Sink>, spec: QuerySpec) -> Result<()> {
        match self.gate(|reply| QueuedOp::Select {
            x: x.clone(),
            sink: Arc::clone(&sink),
            spec: spec.clone(),
            reply,
        }) {
            Gate::Direct(delegate) => delegate.select(x, sink, spec).await,
            Gate::Queued(rx) => rx.await.map_err(|_| DaoError::PromiseDropped)?,
        }
    }

    async fn remove_all(&self, x: &Context, spec: QuerySpec) -> Result<()> {
        match self.gate(|reply| QueuedOp::RemoveAll {
            x: x.clone(),
            spec: spec.clone(),
            reply,
        }) {
            Gate::Direct(delegate) => delegate.remove_all(x, spec).await,
            Gate::Queued(rx) => rx.await.map_err(|_| DaoError::PromiseDropped)?,
        }
    }

    fn listen(
        &self,
        x: &Context,
        sink: Arc<dyn Sink>,
        predicate: Option<Arc<dyn Predicate>>,
    ) -> Result<Subscription> {
        let mut state = self.state.lock();
        if let Some(delegate) = &state.resolved {
            if !state.draining && state.queue.is_empty() {
                return delegate.listen(x, sink, predicate);
            }
        }
        let handle = Arc::new(PendingListen {
            cancelled: AtomicBool::new(false),
            inner: Mutex::new(None),
        });
        state.queue.push(QueuedOp::Listen {
            x: x.clone(),
            sink,
            predicate,
            handle: Arc::clone(&handle),
        });
        Ok(Subscription::from_arc(handle))
    }

    async fn cmd(&self, x: &Context, cmd: &Command) -> CmdOutcome {
        match answer_kind(self.kind(), cmd) {
            CmdOutcome::NotHandled => {}
            handled => return handled,
        }
        match self.gate(|reply| QueuedOp::Cmd {
            x: x.clone(),
            cmd: cmd.clone(),
            reply,
        }) {
            Gate::Direct(delegate) => delegate.cmd(x, cmd).await,
            Gate::Queued(rx) => rx.await.unwrap_or(CmdOutcome::NotHandled),
        }
    }
}
