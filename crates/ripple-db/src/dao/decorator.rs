//! Narrowing decorators.
//!
//! Each decorator holds exactly one delegate and one narrowing parameter.
//! Terminal operations forward down the chain, merging the parameter into
//! the flowing [`QuerySpec`] additively — predicates conjoin, the other
//! three are first-wins — so the final spec does not depend on the order
//! the decorators were chained in. Mutations always pass through
//! unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::Context;
use crate::error::Result;
use crate::query::comparator::Comparator;
use crate::query::predicate::{self, Predicate};
use crate::query::spec::QuerySpec;
use crate::reactive::registry::Subscription;
use crate::schema::RecordClass;
use crate::sink::Sink;

use super::base::{answer_kind, next_uid};
use super::{Command, CmdOutcome, Dao};

// ============================================================================
// FilteredDao
// ============================================================================

/// Narrows its delegate to records matching a predicate.
pub struct FilteredDao {
    uid: u64,
    delegate: Arc<dyn Dao>,
    predicate: Arc<dyn Predicate>,
}

impl FilteredDao {
    pub fn new(delegate: Arc<dyn Dao>, predicate: Arc<dyn Predicate>) -> Self {
        Self {
            uid: next_uid(),
            delegate,
            predicate,
        }
    }
}

#[async_trait]
impl Dao for FilteredDao {
    fn of(&self) -> Arc<RecordClass> {
        self.delegate.of()
    }

    fn uid(&self) -> u64 {
        self.uid
    }

    fn kind(&self) -> &'static str {
        "ripple.dao.FilteredDao"
    }

    async fn put(&self, x: &Context, record: Value) -> Result<Value> {
        self.delegate.put(x, record).await
    }

    async fn remove(&self, x: &Context, record: Value) -> Result<()> {
        self.delegate.remove(x, record).await
    }

    /// A record outside the filtered view is reported absent even when
    /// the delegate stores it.
    async fn find(&self, x: &Context, id: &Value) -> Result<Option<Value>> {
        match self.delegate.find(x, id).await? {
            Some(record) if self.predicate.test(&record) => Ok(Some(record)),
            _ => Ok(None),
        }
    }

    async fn select(&self, x: &Context, sink: Arc<dyn Sink>, spec: QuerySpec) -> Result<()> {
        self.delegate
            .select(x, sink, spec.with_predicate(Arc::clone(&self.predicate)))
            .await
    }

    async fn remove_all(&self, x: &Context, spec: QuerySpec) -> Result<()> {
        self.delegate
            .remove_all(x, spec.with_predicate(Arc::clone(&self.predicate)))
            .await
    }

    fn listen(
        &self,
        x: &Context,
        sink: Arc<dyn Sink>,
        predicate: Option<Arc<dyn Predicate>>,
    ) -> Result<Subscription> {
        let combined = match predicate {
            Some(p) => predicate::and(Arc::clone(&self.predicate), p),
            None => Arc::clone(&self.predicate),
        };
        self.delegate.listen(x, sink, Some(combined))
    }

    async fn cmd(&self, x: &Context, cmd: &Command) -> CmdOutcome {
        match answer_kind(self.kind(), cmd) {
            CmdOutcome::NotHandled => self.delegate.cmd(x, cmd).await,
            handled => handled,
        }
    }
}

// ============================================================================
// OrderedDao
// ============================================================================

/// Orders its delegate's `select` results.
pub struct OrderedDao {
    uid: u64,
    delegate: Arc<dyn Dao>,
    comparator: Arc<dyn Comparator>,
}

impl OrderedDao {
    pub fn new(delegate: Arc<dyn Dao>, comparator: Arc<dyn Comparator>) -> Self {
        Self {
            uid: next_uid(),
            delegate,
            comparator,
        }
    }
}

#[async_trait]
impl Dao for OrderedDao {
    fn of(&self) -> Arc<RecordClass> {
        self.delegate.of()
    }

    fn uid(&self) -> u64 {
        self.uid
    }

    fn kind(&self) -> &'static str {
        "ripple.dao.OrderedDao"
    }

    async fn put(&self, x: &Context, record: Value) -> Result<Value> {
        self.delegate.put(x, record).await
    }

    async fn remove(&self, x: &Context, record: Value) -> Result<()> {
        self.delegate.remove(x, record).await
    }

    async fn find(&self, x: &Context, id: &Value) -> Result<Option<Value>> {
        self.delegate.find(x, id).await
    }

    async fn select(&self, x: &Context, sink: Arc<dyn Sink>, spec: QuerySpec) -> Result<()> {
        self.delegate
            .select(x, sink, spec.with_order(Arc::clone(&self.comparator)))
            .await
    }

    async fn remove_all(&self, x: &Context, spec: QuerySpec) -> Result<()> {
        self.delegate
            .remove_all(x, spec.with_order(Arc::clone(&self.comparator)))
            .await
    }

    fn listen(
        &self,
        x: &Context,
        sink: Arc<dyn Sink>,
        predicate: Option<Arc<dyn Predicate>>,
    ) -> Result<Subscription> {
        self.delegate.listen(x, sink, predicate)
    }

    async fn cmd(&self, x: &Context, cmd: &Command) -> CmdOutcome {
        match answer_kind(self.kind(), cmd) {
            CmdOutcome::NotHandled => self.delegate.cmd(x, cmd).await,
            handled => handled,
        }
    }
}

// ============================================================================
// SkipDao
// ============================================================================

/// Skips the first `n` results of its delegate's `select`.
pub struct SkipDao {
    uid: u64,
    delegate: Arc<dyn Dao>,
    count: u64,
}

impl SkipDao {
    pub fn new(delegate: Arc<dyn Dao>, count: u64) -> Self {
        Self {
            uid: next_uid(),
            delegate,
            count,
        }
    }
}

#[async_trait]
impl Dao for SkipDao {
    fn of(&self) -> Arc<RecordClass> {
        self.delegate.of()
    }

    fn uid(&self) -> u64 {
        self.uid
    }

    fn kind(&self) -> &'static str {
        "ripple.dao.SkipDao"
    }

    async fn put(&self, x: &Context, record: Value) -> Result<Value> {
        self.delegate.put(x, record).await
    }

    async fn remove(&self, x: &Context, record: Value) -> Result<()> {
        self.delegate.remove(x, record).await
    }

    async fn find(&self, x: &Context, id: &Value) -> Result<Option<Value>> {
        self.delegate.find(x, id).await
    }

    async fn select(&self, x: &Context, sink: Arc<dyn Sink>, spec: QuerySpec) -> Result<()> {
        self.delegate.select(x, sink, spec.with_skip(self.count)).await
    }

    async fn remove_all(&self, x: &Context, spec: QuerySpec) -> Result<()> {
        self.delegate
            .remove_all(x, spec.with_skip(self.count))
            .await
    }

    fn listen(
        &self,
        x: &Context,
        sink: Arc<dyn Sink>,
        predicate: Option<Arc<dyn Predicate>>,
    ) -> Result<Subscription> {
        self.delegate.listen(x, sink, predicate)
    }

    async fn cmd(&self, x: &Context, cmd: &Command) -> CmdOutcome {
        match answer_kind(self.kind(), cmd) {
            CmdOutcome::NotHandled => self.delegate.cmd(x, cmd).await,
            handled => handled,
        }
    }
}

// ============================================================================
// LimitedDao
// ============================================================================

/// Caps its delegate's `select` results.
pub struct LimitedDao {
    uid: u64,
    delegate: Arc<dyn Dao>,
    count: u64,
}

impl LimitedDao {
    pub fn new(delegate: Arc<dyn Dao>, count: u64) -> Self {
        Self {
            uid: next_uid(),
            delegate,
            count,
        }
    }
}

#[async_trait]
impl Dao for LimitedDao {
    fn of(&self) -> Arc<RecordClass> {
        self.delegate.of()
    }

    fn uid(&self) -> u64 {
        self.uid
    }

    fn kind(&self) -> &'static str {
        "ripple.dao.LimitedDao"
    }

    async fn put(&self, x: &Context, record: Value) -> Result<Value> {
        self.delegate.put(x, record).await
    }

    async fn remove(&self, x: &Context, record: Value) -> Result<()> {
        self.delegate.remove(x, record).await
    }

    async fn find(&self, x: &Context, id: &Value) -> Result<Option<Value>> {
        self.delegate.find(x, id).await
    }

    async fn select(&self, x: &Context, sink: Arc<dyn Sink>, spec: QuerySpec) -> Result<()> {
        self.delegate
            .select(x, sink, spec.with_limit(self.count))
            .await
    }

    async fn remove_all(&self, x: &Context, spec: QuerySpec) -> Result<()> {
        self.delegate
            .remove_all(x, spec.with_limit(self.count))
            .await
    }

    fn listen(
        &self,
        x: &Context,
        sink: Arc<dyn Sink>,
        predicate: Option<Arc<dyn Predicate>>,
    ) -> Result<Subscription> {
        self.delegate.listen(x, sink, predicate)
    }

    async fn cmd(&self, x: &Context, cmd: &Command) -> CmdOutcome {
        match answer_kind(self.kind(), cmd) {
            CmdOutcome::NotHandled => self.delegate.cmd(x, cmd).await,
            handled => handled,
        }
    }
}
