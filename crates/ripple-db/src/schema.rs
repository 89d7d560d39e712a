//! Record class descriptors.
//!
//! A [`RecordClass`] describes the one class of record a DAO stores: a name
//! (used by the out-of-band command channel and error messages) and the
//! field path of the record's primary key. Records themselves are
//! `serde_json::Value` documents.

use serde_json::Value;

use crate::error::{DaoError, Result};
use crate::query::operators::get_field_value;

/// Default primary key field when none is specified.
const DEFAULT_PRIMARY_KEY: &str = "id";

/// Descriptor for the record class stored by a DAO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordClass {
    name: String,
    primary_key: String,
}

impl RecordClass {
    /// Create a record class keyed by the default `"id"` field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
        }
    }

    /// Override the primary key field path (dotted paths allowed).
    pub fn with_primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = field.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Extract the record's identity value.
    ///
    /// A missing or null key is a contract violation by the caller, not a
    /// store failure.
    pub fn primary_key_value(&self, record: &Value) -> Result<Value> {
        match get_field_value(record, &self.primary_key) {
            Some(v) if !v.is_null() => Ok(v.clone()),
            _ => Err(DaoError::MissingPrimaryKey {
                class: self.name.clone(),
                field: self.primary_key.clone(),
            }),
        }
    }
}
