//! The DAO contract and its composition surface.
//!
//! A [`Dao`] is a uniform interface to a named, typed collection of
//! records, independent of backing storage. Query narrowing composes
//! through decorator DAOs ([`DaoExt::filter`], [`DaoExt::order_by`],
//! [`DaoExt::skip`], [`DaoExt::limit`]), each wrapping its delegate and
//! merging one parameter into the flowing [`QuerySpec`]. Terminal
//! operations run against the innermost store; mutations publish back out
//! through the listener machinery in [`crate::reactive`].
//!
//! # Modules
//!
//! - [`base`] — shared plumbing concrete DAOs embed.
//! - [`decorator`] — the four narrowing decorators.
//! - [`proxy`] — swappable-delegate proxy.
//! - [`promised`] — deferred-delegate DAO with ordered replay.
//! - [`null`] — inert leaf.
//! - [`memory`] — in-memory reference store.

pub mod base;
pub mod decorator;
pub mod memory;
pub mod null;
pub mod promised;
pub mod proxy;

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::Context;
use crate::error::Result;
use crate::query::predicate::Predicate;
use crate::query::spec::QuerySpec;
use crate::reactive::registry::Subscription;
use crate::schema::RecordClass;
use crate::sink::pipe::{InitialLoadSink, PipeSink};
use crate::sink::{ArraySink, CountSink, Sink};

pub use decorator::{FilteredDao, LimitedDao, OrderedDao, SkipDao};
pub use memory::MemoryDao;
pub use null::NullDao;
pub use promised::PromisedDao;
pub use proxy::ProxyDao;

// ============================================================================
// Command channel
// ============================================================================

/// Out-of-band commands a DAO may answer.
///
/// The textual wire form `"CLASS? <name>"` parses to [`Command::IsKind`];
/// anything else is carried opaquely so decorator chains can fall through
/// to a delegate that recognizes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Is this DAO's concrete kind the named one?
    IsKind { name: String },
    /// An unclassified command payload.
    Other(Value),
}

impl Command {
    /// Parse the textual command form.
    pub fn parse(text: &str) -> Self {
        match text.strip_prefix("CLASS? ") {
            Some(name) => Self::IsKind {
                name: name.trim().to_string(),
            },
            None => Self::Other(Value::String(text.to_string())),
        }
    }
}

/// Outcome of a command dispatch. `NotHandled` is a sentinel, not an
/// error: it tells the caller no DAO in the chain recognized the command.
#[derive(Debug, Clone, PartialEq)]
pub enum CmdOutcome {
    Handled(Value),
    NotHandled,
}

impl CmdOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled(_))
    }
}

// ============================================================================
// The Dao contract
// ============================================================================

/// Uniform interface every store and every decorator implements.
///
/// Every data operation takes the ambient [`Context`] explicitly. Mutating
/// and selecting operations are async; `listen` registers synchronously
/// and returns its [`Subscription`] immediately.
#[async_trait]
pub trait Dao: Send + Sync {
    /// The record class this DAO stores.
    fn of(&self) -> Arc<RecordClass>;

    /// Stable identity assigned at creation, used to compare DAOs.
    fn uid(&self) -> u64;

    /// Dotted kind name answered by [`Command::IsKind`].
    fn kind(&self) -> &'static str;

    /// Insert or replace by primary key. Publishes a `put` event carrying
    /// the stored value on success.
    async fn put(&self, x: &Context, record: Value) -> Result<Value>;

    /// Delete by the record's primary key. Publishes a `remove` event if
    /// a record was deleted; removing an absent record is not an error.
    async fn remove(&self, x: &Context, record: Value) -> Result<()>;

    /// Look up a single record by primary key value.
    async fn find(&self, x: &Context, id: &Value) -> Result<Option<Value>>;

    /// Pull every matching record into `sink` (decorated with the spec's
    /// narrowing parameters), then signal `eof`.
    async fn select(&self, x: &Context, sink: Arc<dyn Sink>, spec: QuerySpec) -> Result<()>;

    /// Remove every record matching the spec.
    async fn remove_all(&self, x: &Context, spec: QuerySpec) -> Result<()>;

    /// Subscribe `sink` to future mutations. No initial contents are
    /// delivered. When `predicate` is given, every mutation is collapsed
    /// to a `reset` (see [`base::decorate_listener`]).
    fn listen(
        &self,
        x: &Context,
        sink: Arc<dyn Sink>,
        predicate: Option<Arc<dyn Predicate>>,
    ) -> Result<Subscription>;

    /// Dispatch an out-of-band command.
    async fn cmd(&self, x: &Context, cmd: &Command) -> CmdOutcome;
}

/// Order two DAOs by creation identity, not content.
pub fn compare_by_identity(a: &dyn Dao, b: &dyn Dao) -> Ordering {
    a.uid().cmp(&b.uid())
}

// ============================================================================
// DaoExt — builders and conveniences over any Arc<dyn Dao>
// ============================================================================

/// Query builders and terminal conveniences.
///
/// Each builder returns a new decorator DAO wrapping the receiver as its
/// delegate; the receiver is never mutated. Builders are chainable in any
/// order with the same final effect, because each decorator only adds its
/// own parameter to the spec flowing toward the store.
#[async_trait]
pub trait DaoExt {
    /// Narrow to records matching `predicate`.
    fn filter(&self, predicate: Arc<dyn Predicate>) -> Arc<dyn Dao>;

    /// Order `select` results by `comparator`.
    fn order_by(&self, comparator: Arc<dyn crate::query::comparator::Comparator>) -> Arc<dyn Dao>;

    /// Drop the first `n` results of a `select`.
    fn skip(&self, n: u64) -> Arc<dyn Dao>;

    /// Cap `select` results at `n`.
    fn limit(&self, n: u64) -> Arc<dyn Dao>;

    /// Bind this DAO to a specific ambient context.
    fn in_context(&self, x: &Context) -> BoundDao;

    /// Select everything into a fresh collecting sink and return the
    /// records.
    async fn select_array(&self, x: &Context) -> Result<Vec<Value>>;

    /// Count matching records without materializing them.
    async fn count(&self, x: &Context) -> Result<u64>;

    /// Return the sole record matching `predicate`, if any — equivalent
    /// to `filter(predicate).limit(1)` then taking the first select
    /// result.
    async fn find_matching(
        &self,
        x: &Context,
        predicate: Arc<dyn Predicate>,
    ) -> Result<Option<Value>>;

    /// Deliver current contents into `sink`, then keep it live.
    ///
    /// The listener is registered before the initial select; mutations
    /// racing the select are buffered and replayed, never dropped.
    async fn pipe(
        &self,
        x: &Context,
        sink: Arc<dyn Sink>,
        predicate: Option<Arc<dyn Predicate>>,
    ) -> Result<Subscription>;
}

#[async_trait]
impl DaoExt for Arc<dyn Dao> {
    fn filter(&self, predicate: Arc<dyn Predicate>) -> Arc<dyn Dao> {
        Arc::new(FilteredDao::new(Arc::clone(self), predicate))
    }

    fn order_by(&self, comparator: Arc<dyn crate::query::comparator::Comparator>) -> Arc<dyn Dao> {
        Arc::new(OrderedDao::new(Arc::clone(self), comparator))
    }

    fn skip(&self, n: u64) -> Arc<dyn Dao> {
        Arc::new(SkipDao::new(Arc::clone(self), n))
    }

    fn limit(&self, n: u64) -> Arc<dyn Dao> {
        Arc::new(LimitedDao::new(Arc::clone(self), n))
    }

    fn in_context(&self, x: &Context) -> BoundDao {
        BoundDao {
            x: x.clone(),
            dao: Arc::clone(self),
        }
    }

    async fn select_array(&self, x: &Context) -> Result<Vec<Value>> {
        let sink = Arc::new(ArraySink::new());
        self.select(x, Arc::clone(&sink) as Arc<dyn Sink>, QuerySpec::new())
            .await?;
        Ok(sink.take())
    }

    async fn count(&self, x: &Context) -> Result<u64> {
        let sink = Arc::new(CountSink::new());
        self.select(x, Arc::clone(&sink) as Arc<dyn Sink>, QuerySpec::new())
            .await?;
        Ok(sink.count())
    }

    async fn find_matching(
        &self,
        x: &Context,
        predicate: Arc<dyn Predicate>,
    ) -> Result<Option<Value>> {
        let sink = Arc::new(ArraySink::new());
        let spec = QuerySpec::new().with_predicate(predicate).with_limit(1);
        self.select(x, Arc::clone(&sink) as Arc<dyn Sink>, spec)
            .await?;
        Ok(sink.take().into_iter().next())
    }

    async fn pipe(
        &self,
        x: &Context,
        sink: Arc<dyn Sink>,
        predicate: Option<Arc<dyn Predicate>>,
    ) -> Result<Subscription> {
        let gate = Arc::new(PipeSink::new(Arc::clone(&sink)));
        let sub = self.listen(x, Arc::clone(&gate) as Arc<dyn Sink>, predicate.clone())?;

        let mut spec = QuerySpec::new();
        if let Some(p) = predicate {
            spec = spec.with_predicate(p);
        }
        let initial: Arc<dyn Sink> = Arc::new(InitialLoadSink::new(sink));
        if let Err(err) = self.select(x, initial, spec).await {
            sub.detach();
            return Err(err);
        }
        if let Err(err) = gate.release() {
            sub.detach();
            return Err(err);
        }
        Ok(sub)
    }
}

// ============================================================================
// BoundDao
// ============================================================================

/// A DAO bound to one ambient context — the context-substitution proxy.
/// Behavior is otherwise unchanged.
#[derive(Clone)]
pub struct BoundDao {
    x: Context,
    dao: Arc<dyn Dao>,
}

impl BoundDao {
    pub fn context(&self) -> &Context {
        &self.x
    }

    pub fn dao(&self) -> &Arc<dyn Dao> {
        &self.dao
    }

    pub async fn put(&self, record: Value) -> Result<Value> {
        self.dao.put(&self.x, record).await
    }

    pub async fn remove(&self, record: Value) -> Result<()> {
        self.dao.remove(&self.x, record).await
    }

    pub async fn find(&self, id: &Value) -> Result<Option<Value>> {
        self.dao.find(&self.x, id).await
    }

    pub async fn select(&self, sink: Arc<dyn Sink>, spec: QuerySpec) -> Result<()> {
        self.dao.select(&self.x, sink, spec).await
    }

    pub async fn select_array(&self) -> Result<Vec<Value>> {
        self.dao.select_array(&self.x).await
    }

    pub async fn remove_all(&self, spec: QuerySpec) -> Result<()> {
        self.dao.remove_all(&self.x, spec).await
    }

    pub fn listen(
        &self,
        sink: Arc<dyn Sink>,
        predicate: Option<Arc<dyn Predicate>>,
    ) -> Result<Subscription> {
        self.dao.listen(&self.x, sink, predicate)
    }

    pub async fn cmd(&self, cmd: &Command) -> CmdOutcome {
        self.dao.cmd(&self.x, cmd).await
    }
}
