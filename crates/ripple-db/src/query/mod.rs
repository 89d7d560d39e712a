//! Query building blocks: value comparison, predicates, comparators, and
//! the unified query specification.
//!
//! # Modules
//!
//! - [`operators`] — JSON value comparison and field-path access.
//! - [`predicate`] — [`Predicate`] trait and combinators with partial
//!   evaluation.
//! - [`comparator`] — [`Comparator`] trait and field/chained orderings.
//! - [`spec`] — [`QuerySpec`], the immutable narrowing tuple decorators
//!   merge into.

pub mod comparator;
pub mod operators;
pub mod predicate;
pub mod spec;

pub use comparator::{Comparator, SortDirection};
pub use predicate::Predicate;
pub use spec::QuerySpec;
