//! The unified query specification.
//!
//! Every narrowing path — fluent decorator DAOs and direct `select` calls —
//! funnels into one immutable [`QuerySpec`]. Decorators merge their single
//! parameter additively as the spec flows toward the leaf store, so the
//! final spec is independent of the order the decorators were chained in:
//! predicates conjoin, and for `skip`/`limit`/`order` the value set first
//! (by the outermost decorator) wins.

use std::sync::Arc;

use crate::query::comparator::Comparator;
use crate::query::predicate::{self, Predicate};

/// Immutable narrowing tuple attached to a select/removeAll traversal.
#[derive(Clone, Default)]
pub struct QuerySpec {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub order: Option<Arc<dyn Comparator>>,
    pub predicate: Option<Arc<dyn Predicate>>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conjoin `p` with any predicate already present.
    pub fn with_predicate(mut self, p: Arc<dyn Predicate>) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => predicate::and(existing, p),
            None => p,
        });
        self
    }

    /// Add an ordering unless one is already set.
    pub fn with_order(mut self, order: Arc<dyn Comparator>) -> Self {
        self.order.get_or_insert(order);
        self
    }

    /// Add a skip count unless one is already set.
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip.get_or_insert(skip);
        self
    }

    /// Add a result cap unless one is already set.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit.get_or_insert(limit);
        self
    }

    /// True when no narrowing parameter is set.
    pub fn is_empty(&self) -> bool {
        self.skip.is_none()
            && self.limit.is_none()
            && self.order.is_none()
            && self.predicate.is_none()
    }
}

impl std::fmt::Debug for QuerySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySpec")
            .field("skip", &self.skip)
            .field("limit", &self.limit)
            .field("order", &self.order.as_ref().map(|_| "<comparator>"))
            .field("predicate", &self.predicate.as_ref().map(|_| "<predicate>"))
            .finish()
    }
}
