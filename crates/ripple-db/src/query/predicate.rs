//! Boolean tests over records, with partial evaluation.
//!
//! A [`Predicate`] answers whether a record belongs to a result set.
//! `partial_eval()` may return a simplified equivalent (folding constant
//! sub-expressions) so callers can avoid wrapping sinks in no-op filters;
//! `None` means the predicate is already minimal.
//!
//! A predicate that panics during `test` is a contract violation by that
//! predicate. Nothing in this crate catches it.

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::Value;

use super::operators::{compare_values, deep_equals, get_field_value};

/// Boolean test over a record.
pub trait Predicate: Send + Sync {
    fn test(&self, record: &Value) -> bool;

    /// Return a cheaper equivalent predicate, or `None` if already minimal.
    fn partial_eval(&self) -> Option<Arc<dyn Predicate>> {
        None
    }

    /// True if this predicate accepts every record.
    fn always_true(&self) -> bool {
        false
    }

    /// True if this predicate rejects every record.
    fn always_false(&self) -> bool {
        false
    }
}

// ============================================================================
// Constants
// ============================================================================

/// Accepts everything.
pub struct True;

impl Predicate for True {
    fn test(&self, _record: &Value) -> bool {
        true
    }

    fn always_true(&self) -> bool {
        true
    }
}

/// Rejects everything.
pub struct False;

impl Predicate for False {
    fn test(&self, _record: &Value) -> bool {
        false
    }

    fn always_false(&self) -> bool {
        true
    }
}

// ============================================================================
// Field comparisons
// ============================================================================

enum FieldOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Compares a (possibly nested) field against a constant.
///
/// Ordering comparisons against null are false on either side, matching the
/// query engine convention that null is not ordered relative to values.
pub struct FieldCompare {
    field: String,
    op: FieldOp,
    value: Value,
}

impl FieldCompare {
    fn resolve<'a>(&self, record: &'a Value) -> &'a Value {
        get_field_value(record, &self.field).unwrap_or(&Value::Null)
    }
}

impl Predicate for FieldCompare {
    fn test(&self, record: &Value) -> bool {
        let actual = self.resolve(record);
        match self.op {
            FieldOp::Eq => deep_equals(actual, &self.value),
            FieldOp::Neq => !deep_equals(actual, &self.value),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                if actual.is_null() || self.value.is_null() {
                    return false;
                }
                let cmp = compare_values(actual, &self.value);
                match self.op {
                    FieldOp::Gt => cmp == Ordering::Greater,
                    FieldOp::Gte => cmp != Ordering::Less,
                    FieldOp::Lt => cmp == Ordering::Less,
                    FieldOp::Lte => cmp != Ordering::Greater,
                    FieldOp::Eq | FieldOp::Neq => unreachable!(),
                }
            }
        }
    }
}

/// True when the field resolves to a non-null value.
pub struct Has {
    field: String,
}

impl Predicate for Has {
    fn test(&self, record: &Value) -> bool {
        matches!(get_field_value(record, &self.field), Some(v) if !v.is_null())
    }
}

// ============================================================================
// Logical combinators
// ============================================================================

/// Conjunction. Empty `And` is vacuously true.
pub struct And(pub Vec<Arc<dyn Predicate>>);

impl Predicate for And {
    fn test(&self, record: &Value) -> bool {
        self.0.iter().all(|p| p.test(record))
    }

    fn partial_eval(&self) -> Option<Arc<dyn Predicate>> {
        let mut kept: Vec<Arc<dyn Predicate>> = Vec::new();
        for child in &self.0 {
            let child = child.partial_eval().unwrap_or_else(|| Arc::clone(child));
            if child.always_false() {
                return Some(Arc::new(False));
            }
            if !child.always_true() {
                kept.push(child);
            }
        }
        match kept.len() {
            0 => Some(Arc::new(True)),
            1 => Some(kept.into_iter().next().unwrap()),
            _ if kept.len() == self.0.len() => None,
            _ => Some(Arc::new(And(kept))),
        }
    }
}

/// Disjunction. Empty `Or` is vacuously false.
pub struct Or(pub Vec<Arc<dyn Predicate>>);

impl Predicate for Or {
    fn test(&self, record: &Value) -> bool {
        self.0.iter().any(|p| p.test(record))
    }

    fn partial_eval(&self) -> Option<Arc<dyn Predicate>> {
        let mut kept: Vec<Arc<dyn Predicate>> = Vec::new();
        for child in &self.0 {
            let child = child.partial_eval().unwrap_or_else(|| Arc::clone(child));
            if child.always_true() {
                return Some(Arc::new(True));
            }
            if !child.always_false() {
                kept.push(child);
            }
        }
        match kept.len() {
            0 => Some(Arc::new(False)),
            1 => Some(kept.into_iter().next().unwrap()),
            _ if kept.len() == self.0.len() => None,
            _ => Some(Arc::new(Or(kept))),
        }
    }
}

/// Negation.
pub struct Not(pub Arc<dyn Predicate>);

impl Predicate for Not {
    fn test(&self, record: &Value) -> bool {
        !self.0.test(record)
    }

    fn partial_eval(&self) -> Option<Arc<dyn Predicate>> {
        let inner = self.0.partial_eval().unwrap_or_else(|| Arc::clone(&self.0));
        if inner.always_true() {
            return Some(Arc::new(False));
        }
        if inner.always_false() {
            return Some(Arc::new(True));
        }
        None
    }
}

// ============================================================================
// Constructors
// ============================================================================

fn field_compare(field: impl Into<String>, op: FieldOp, value: Value) -> Arc<dyn Predicate> {
    Arc::new(FieldCompare {
        field: field.into(),
        op,
        value,
    })
}

pub fn eq(field: impl Into<String>, value: Value) -> Arc<dyn Predicate> {
    field_compare(field, FieldOp::Eq, value)
}

pub fn neq(field: impl Into<String>, value: Value) -> Arc<dyn Predicate> {
    field_compare(field, FieldOp::Neq, value)
}

pub fn gt(field: impl Into<String>, value: Value) -> Arc<dyn Predicate> {
    field_compare(field, FieldOp::Gt, value)
}

pub fn gte(field: impl Into<String>, value: Value) -> Arc<dyn Predicate> {
    field_compare(field, FieldOp::Gte, value)
}

pub fn lt(field: impl Into<String>, value: Value) -> Arc<dyn Predicate> {
    field_compare(field, FieldOp::Lt, value)
}

pub fn lte(field: impl Into<String>, value: Value) -> Arc<dyn Predicate> {
    field_compare(field, FieldOp::Lte, value)
}

pub fn has(field: impl Into<String>) -> Arc<dyn Predicate> {
    Arc::new(Has {
        field: field.into(),
    })
}

pub fn always() -> Arc<dyn Predicate> {
    Arc::new(True)
}

pub fn never() -> Arc<dyn Predicate> {
    Arc::new(False)
}

/// Conjoin two predicates.
pub fn and(a: Arc<dyn Predicate>, b: Arc<dyn Predicate>) -> Arc<dyn Predicate> {
    Arc::new(And(vec![a, b]))
}

/// Disjoin two predicates.
pub fn or(a: Arc<dyn Predicate>, b: Arc<dyn Predicate>) -> Arc<dyn Predicate> {
    Arc::new(Or(vec![a, b]))
}

pub fn not(p: Arc<dyn Predicate>) -> Arc<dyn Predicate> {
    Arc::new(Not(p))
}
