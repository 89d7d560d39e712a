//! Push-style receivers of records and mutation events.
//!
//! A [`Sink`] is the write/notify target of a select or a live
//! subscription. All delivery methods return a `Result`: a failing
//! delivery during notification triggers automatic deregistration of the
//! offending listener, and a failing delivery during a select aborts the
//! select and propagates to its caller.
//!
//! # Modules
//!
//! - [`decorate`] — limit/skip/order/predicate/dedup wrappers and
//!   [`decorate::decorate_sink`].
//! - [`pipe`] — the buffering gate used by `pipe`.

pub mod decorate;
pub mod pipe;

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::Result;

/// Receiver of records (`put`/`remove`) and stream signals
/// (`reset`/`eof`).
pub trait Sink: Send + Sync {
    fn put(&self, record: &Value) -> Result<()>;

    fn remove(&self, _record: &Value) -> Result<()> {
        Ok(())
    }

    /// The source's contents are no longer valid; consumers must re-read.
    fn reset(&self) -> Result<()> {
        Ok(())
    }

    /// End of a finite pull. Never sent on live subscriptions.
    fn eof(&self) -> Result<()> {
        Ok(())
    }

    /// Whether wrapping this sink in an ordering buffer changes its
    /// output. Pure aggregations return `false` so `decorate_sink` can
    /// skip the buffering; forwarding sinks must delegate the answer.
    fn accepts_ordering(&self) -> bool {
        true
    }
}

// ============================================================================
// ArraySink
// ============================================================================

/// Collects every `put` record, in arrival order.
///
/// Used as the default sink when `select` is called without one.
#[derive(Default)]
pub struct ArraySink {
    records: Mutex<Vec<Value>>,
}

impl ArraySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected records.
    pub fn records(&self) -> Vec<Value> {
        self.records.lock().clone()
    }

    /// Drain the collected records, leaving the sink empty.
    pub fn take(&self) -> Vec<Value> {
        std::mem::take(&mut *self.records.lock())
    }
}

impl Sink for ArraySink {
    fn put(&self, record: &Value) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        self.records.lock().clear();
        Ok(())
    }
}

// ============================================================================
// CountSink
// ============================================================================

/// Counts `put` records. Ordering cannot change a count, so this sink
/// opts out of ordering buffers.
#[derive(Default)]
pub struct CountSink {
    count: Mutex<u64>,
}

impl CountSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        *self.count.lock()
    }
}

impl Sink for CountSink {
    fn put(&self, _record: &Value) -> Result<()> {
        *self.count.lock() += 1;
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        *self.count.lock() = 0;
        Ok(())
    }

    fn accepts_ordering(&self) -> bool {
        false
    }
}
