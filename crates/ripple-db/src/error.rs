use thiserror::Error;

// ---------------------------------------------------------------------------
// StoreError — external failures
// ---------------------------------------------------------------------------

/// Errors originating outside the composition engine: a backing store, the
/// network, or serialization inside a store. These propagate to the caller
/// of the failing operation and are never retried here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store \"{store}\" is unavailable: {reason}")]
    Unavailable { store: String, reason: String },

    #[error("store rejected {operation} on \"{class}\": {message}")]
    Rejected {
        class: String,
        operation: String,
        message: String,
    },

    #[error("store I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

// ---------------------------------------------------------------------------
// DaoError
// ---------------------------------------------------------------------------

/// Top-level error type for all DAO operations.
///
/// External store failures are wrapped transparently; the remaining variants
/// are contract violations by the caller or by this crate's own plumbing.
#[derive(Debug, Error)]
pub enum DaoError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("record in \"{class}\" has no value for primary key field \"{field}\"")]
    MissingPrimaryKey { class: String, field: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("deferred delegate was dropped before resolution")]
    PromiseDropped,

    #[error("deferred delegate was already resolved")]
    AlreadyResolved,

    #[error("sink refused delivery: {0}")]
    SinkClosed(String),
}

pub type Result<T> = std::result::Result<T, DaoError>;
