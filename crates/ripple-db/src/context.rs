//! Ambient execution context, passed explicitly to every DAO operation.
//!
//! The context carries environment values and service handles as JSON
//! values keyed by name. It is immutable; `with()` produces a child context
//! sharing nothing mutable with its parent, so a context captured by a
//! listener stays valid for the listener's whole lifetime.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

/// Immutable string-keyed environment passed by parameter to DAO operations.
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: Arc<HashMap<String, Value>>,
}

impl Context {
    /// An empty root context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a child context with `key` bound to `value`.
    ///
    /// The parent is unchanged.
    pub fn with(&self, key: impl Into<String>, value: Value) -> Self {
        let mut values: HashMap<String, Value> = (*self.values).clone();
        values.insert(key.into(), value);
        Self {
            values: Arc::new(values),
        }
    }

    /// Look up a value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}
