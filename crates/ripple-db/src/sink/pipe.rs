//! The buffering gate behind `pipe`.
//!
//! `pipe` must deliver a DAO's current contents and then keep the sink
//! live, without dropping mutations that land while the initial select is
//! still draining. The listener is registered *before* the select, with a
//! [`PipeSink`] in front of the consumer: events arriving while the gate
//! is closed are buffered; [`PipeSink::release`] replays the buffer in
//! arrival order and opens the gate. A replayed event may repeat a record
//! the initial snapshot already contained — an idempotent upsert for a
//! keyed consumer — but no event is ever lost.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::error::Result;

use super::Sink;

enum Buffered {
    Put(Value),
    Remove(Value),
    Reset,
}

struct PipeState {
    live: bool,
    buffer: Vec<Buffered>,
}

/// Gate between a live subscription and the consumer sink.
pub struct PipeSink {
    delegate: Arc<dyn Sink>,
    state: Mutex<PipeState>,
}

impl PipeSink {
    pub fn new(delegate: Arc<dyn Sink>) -> Self {
        Self {
            delegate,
            state: Mutex::new(PipeState {
                live: false,
                buffer: Vec::new(),
            }),
        }
    }

    fn deliver(&self, event: Buffered) -> Result<()> {
        match event {
            Buffered::Put(v) => self.delegate.put(&v),
            Buffered::Remove(v) => self.delegate.remove(&v),
            Buffered::Reset => self.delegate.reset(),
        }
    }

    fn forward(&self, event: Buffered) -> Result<()> {
        {
            let mut state = self.state.lock();
            if !state.live {
                state.buffer.push(event);
                return Ok(());
            }
        }
        // Lock released before touching the delegate.
        self.deliver(event)
    }

    /// Replay buffered events in arrival order, then open the gate.
    ///
    /// Events arriving during the replay keep buffering (the gate is only
    /// opened once the buffer drains empty), so arrival order is
    /// preserved end to end.
    pub fn release(&self) -> Result<()> {
        loop {
            let batch = {
                let mut state = self.state.lock();
                if state.buffer.is_empty() {
                    state.live = true;
                    return Ok(());
                }
                std::mem::take(&mut state.buffer)
            };
            for event in batch {
                self.deliver(event)?;
            }
        }
    }
}

impl Sink for PipeSink {
    fn put(&self, record: &Value) -> Result<()> {
        self.forward(Buffered::Put(record.clone()))
    }

    fn remove(&self, record: &Value) -> Result<()> {
        self.forward(Buffered::Remove(record.clone()))
    }

    fn reset(&self) -> Result<()> {
        self.forward(Buffered::Reset)
    }

    fn accepts_ordering(&self) -> bool {
        self.delegate.accepts_ordering()
    }
}

// ============================================================================
// InitialLoadSink
// ============================================================================

/// Forwards the initial select's records but swallows `eof`, so the
/// consumer never sees an end-of-stream on a subscription that stays
/// live.
pub struct InitialLoadSink {
    delegate: Arc<dyn Sink>,
}

impl InitialLoadSink {
    pub fn new(delegate: Arc<dyn Sink>) -> Self {
        Self { delegate }
    }
}

impl Sink for InitialLoadSink {
    fn put(&self, record: &Value) -> Result<()> {
        self.delegate.put(record)
    }

    fn remove(&self, record: &Value) -> Result<()> {
        self.delegate.remove(record)
    }

    fn reset(&self) -> Result<()> {
        self.delegate.reset()
    }

    fn eof(&self) -> Result<()> {
        Ok(())
    }

    fn accepts_ordering(&self) -> bool {
        self.delegate.accepts_ordering()
    }
}
