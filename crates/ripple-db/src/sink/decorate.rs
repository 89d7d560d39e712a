//! Sink decoration — the single source of truth for query semantics.
//!
//! [`decorate_sink`] wraps a sink in this fixed construction order,
//! innermost first: **limit**, **skip**, **order**, **predicate**. Events
//! therefore flow predicate → order → skip → limit, matching conventional
//! query evaluation (filter, sort, paginate).

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::Result;
use crate::query::comparator::Comparator;
use crate::query::predicate::Predicate;
use crate::query::spec::QuerySpec;
use crate::schema::RecordClass;

use super::Sink;

// ============================================================================
// LimitedSink
// ============================================================================

/// Forwards at most `limit` records, then drops the rest.
pub struct LimitedSink {
    limit: u64,
    seen: Mutex<u64>,
    delegate: Arc<dyn Sink>,
}

impl LimitedSink {
    pub fn new(limit: u64, delegate: Arc<dyn Sink>) -> Self {
        Self {
            limit,
            seen: Mutex::new(0),
            delegate,
        }
    }
}

impl Sink for LimitedSink {
    fn put(&self, record: &Value) -> Result<()> {
        {
            let mut seen = self.seen.lock();
            if *seen >= self.limit {
                return Ok(());
            }
            *seen += 1;
        }
        self.delegate.put(record)
    }

    fn remove(&self, record: &Value) -> Result<()> {
        self.delegate.remove(record)
    }

    fn reset(&self) -> Result<()> {
        self.delegate.reset()
    }

    fn eof(&self) -> Result<()> {
        self.delegate.eof()
    }

    fn accepts_ordering(&self) -> bool {
        self.delegate.accepts_ordering()
    }
}

// ============================================================================
// SkipSink
// ============================================================================

/// Drops the first `skip` records, forwards the rest.
pub struct SkipSink {
    skip: u64,
    dropped: Mutex<u64>,
    delegate: Arc<dyn Sink>,
}

impl SkipSink {
    pub fn new(skip: u64, delegate: Arc<dyn Sink>) -> Self {
        Self {
            skip,
            dropped: Mutex::new(0),
            delegate,
        }
    }
}

impl Sink for SkipSink {
    fn put(&self, record: &Value) -> Result<()> {
        {
            let mut dropped = self.dropped.lock();
            if *dropped < self.skip {
                *dropped += 1;
                return Ok(());
            }
        }
        self.delegate.put(record)
    }

    fn remove(&self, record: &Value) -> Result<()> {
        self.delegate.remove(record)
    }

    fn reset(&self) -> Result<()> {
        self.delegate.reset()
    }

    fn eof(&self) -> Result<()> {
        self.delegate.eof()
    }

    fn accepts_ordering(&self) -> bool {
        self.delegate.accepts_ordering()
    }
}

// ============================================================================
// OrderedSink
// ============================================================================

/// Buffers every record and flushes them in comparator order on `eof`.
///
/// Buffering is required to produce a total order over an unordered
/// source; the flush uses a stable sort so equal records keep arrival
/// order.
pub struct OrderedSink {
    comparator: Arc<dyn Comparator>,
    buffer: Mutex<Vec<Value>>,
    delegate: Arc<dyn Sink>,
}

impl OrderedSink {
    pub fn new(comparator: Arc<dyn Comparator>, delegate: Arc<dyn Sink>) -> Self {
        Self {
            comparator,
            buffer: Mutex::new(Vec::new()),
            delegate,
        }
    }
}

impl Sink for OrderedSink {
    fn put(&self, record: &Value) -> Result<()> {
        self.buffer.lock().push(record.clone());
        Ok(())
    }

    fn remove(&self, record: &Value) -> Result<()> {
        self.delegate.remove(record)
    }

    fn reset(&self) -> Result<()> {
        self.buffer.lock().clear();
        self.delegate.reset()
    }

    fn eof(&self) -> Result<()> {
        let mut buffered = std::mem::take(&mut *self.buffer.lock());
        buffered.sort_by(|a, b| self.comparator.compare(a, b));
        for record in &buffered {
            self.delegate.put(record)?;
        }
        self.delegate.eof()
    }

    fn accepts_ordering(&self) -> bool {
        self.delegate.accepts_ordering()
    }
}

// ============================================================================
// PredicatedSink
// ============================================================================

/// Forwards only records matching the predicate.
pub struct PredicatedSink {
    predicate: Arc<dyn Predicate>,
    delegate: Arc<dyn Sink>,
}

impl PredicatedSink {
    pub fn new(predicate: Arc<dyn Predicate>, delegate: Arc<dyn Sink>) -> Self {
        Self {
            predicate,
            delegate,
        }
    }
}

impl Sink for PredicatedSink {
    fn put(&self, record: &Value) -> Result<()> {
        if self.predicate.test(record) {
            self.delegate.put(record)?;
        }
        Ok(())
    }

    fn remove(&self, record: &Value) -> Result<()> {
        if self.predicate.test(record) {
            self.delegate.remove(record)?;
        }
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        self.delegate.reset()
    }

    fn eof(&self) -> Result<()> {
        self.delegate.eof()
    }

    fn accepts_ordering(&self) -> bool {
        self.delegate.accepts_ordering()
    }
}

// ============================================================================
// DedupSink
// ============================================================================

/// Forwards each primary key at most once.
pub struct DedupSink {
    class: Arc<RecordClass>,
    seen: Mutex<std::collections::HashSet<String>>,
    delegate: Arc<dyn Sink>,
}

impl DedupSink {
    pub fn new(class: Arc<RecordClass>, delegate: Arc<dyn Sink>) -> Self {
        Self {
            class,
            seen: Mutex::new(std::collections::HashSet::new()),
            delegate,
        }
    }
}

impl Sink for DedupSink {
    fn put(&self, record: &Value) -> Result<()> {
        let key = self.class.primary_key_value(record)?;
        if self.seen.lock().insert(key.to_string()) {
            self.delegate.put(record)?;
        }
        Ok(())
    }

    fn remove(&self, record: &Value) -> Result<()> {
        self.delegate.remove(record)
    }

    fn reset(&self) -> Result<()> {
        self.seen.lock().clear();
        self.delegate.reset()
    }

    fn eof(&self) -> Result<()> {
        self.delegate.eof()
    }

    fn accepts_ordering(&self) -> bool {
        self.delegate.accepts_ordering()
    }
}

// ============================================================================
// decorate_sink
// ============================================================================

/// Wrap `sink` with the spec's narrowing parameters.
///
/// Construction order is fixed (limit, skip, order, predicate), so a
/// record flows predicate → order → skip → limit. Two wraps are elided:
/// a predicate whose partial evaluation is universally true, and an
/// ordering over a sink that reports ordering cannot affect it.
pub fn decorate_sink(sink: Arc<dyn Sink>, spec: &QuerySpec) -> Arc<dyn Sink> {
    let mut sink = sink;

    if let Some(limit) = spec.limit {
        sink = Arc::new(LimitedSink::new(limit, sink));
    }

    if let Some(skip) = spec.skip {
        sink = Arc::new(SkipSink::new(skip, sink));
    }

    if let Some(order) = &spec.order {
        if sink.accepts_ordering() {
            sink = Arc::new(OrderedSink::new(Arc::clone(order), sink));
        }
    }

    if let Some(predicate) = &spec.predicate {
        let predicate = predicate
            .partial_eval()
            .unwrap_or_else(|| Arc::clone(predicate));
        if !predicate.always_true() {
            sink = Arc::new(PredicatedSink::new(predicate, sink));
        }
    }

    sink
}
