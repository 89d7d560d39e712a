//! DaoEvent — a mutation published by a DAO to its listeners.

use serde_json::Value;

/// A change event published after a mutation is accepted by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaoEvent {
    /// A record was inserted or replaced. Carries the stored value.
    Put(Value),
    /// A record was deleted. Carries the removed value.
    Remove(Value),
    /// The source's contents are no longer valid; consumers must re-read.
    Reset,
}

impl DaoEvent {
    /// The record carried by the event, if any.
    pub fn record(&self) -> Option<&Value> {
        match self {
            Self::Put(v) | Self::Remove(v) => Some(v),
            Self::Reset => None,
        }
    }
}
