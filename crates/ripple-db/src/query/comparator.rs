//! Record orderings.
//!
//! A [`Comparator`] imposes a total or partial order over two records and
//! returns a `std::cmp::Ordering`. Field orderings resolve dotted paths and
//! treat a missing field as null (sorting to the end).

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::operators::{compare_values, get_field_value};

/// Sort direction for a field ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Ordering function over two records.
pub trait Comparator: Send + Sync {
    fn compare(&self, a: &Value, b: &Value) -> Ordering;
}

// ============================================================================
// Field ordering
// ============================================================================

/// Orders records by a single (possibly nested) field.
pub struct FieldOrder {
    field: String,
    direction: SortDirection,
}

impl FieldOrder {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

impl Comparator for FieldOrder {
    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let va = get_field_value(a, &self.field).unwrap_or(&Value::Null);
        let vb = get_field_value(b, &self.field).unwrap_or(&Value::Null);
        let cmp = compare_values(va, vb);
        match self.direction {
            SortDirection::Asc => cmp,
            SortDirection::Desc => cmp.reverse(),
        }
    }
}

// ============================================================================
// Combinators
// ============================================================================

/// Applies each comparator in turn, using the first non-equal answer.
pub struct ChainedOrder(Vec<Arc<dyn Comparator>>);

impl ChainedOrder {
    pub fn new(comparators: Vec<Arc<dyn Comparator>>) -> Self {
        Self(comparators)
    }
}

impl Comparator for ChainedOrder {
    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for cmp in &self.0 {
            let ord = cmp.compare(a, b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

/// Reverses another comparator.
pub struct ReverseOrder(Arc<dyn Comparator>);

impl ReverseOrder {
    pub fn new(inner: Arc<dyn Comparator>) -> Self {
        Self(inner)
    }
}

impl Comparator for ReverseOrder {
    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        self.0.compare(a, b).reverse()
    }
}

// ============================================================================
// Constructors
// ============================================================================

/// Ascending order on `field`.
pub fn asc(field: impl Into<String>) -> Arc<dyn Comparator> {
    Arc::new(FieldOrder::new(field, SortDirection::Asc))
}

/// Descending order on `field`.
pub fn desc(field: impl Into<String>) -> Arc<dyn Comparator> {
    Arc::new(FieldOrder::new(field, SortDirection::Desc))
}

/// Lexicographic combination of several orderings.
pub fn chain(comparators: Vec<Arc<dyn Comparator>>) -> Arc<dyn Comparator> {
    Arc::new(ChainedOrder::new(comparators))
}
