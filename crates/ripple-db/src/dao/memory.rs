//! In-memory reference store.
//!
//! The minimal leaf implementation of the store contract: upsert by
//! primary key publishing the stored value, idempotent remove publishing
//! the removed record, linear `find`, and a snapshot `select` through the
//! decorated sink. Richer engines (indexed, remote) live outside this
//! crate and plug in through the same [`Dao`] contract.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::context::Context;
use crate::error::Result;
use crate::query::operators::deep_equals;
use crate::query::predicate::Predicate;
use crate::query::spec::QuerySpec;
use crate::reactive::registry::Subscription;
use crate::schema::RecordClass;
use crate::sink::decorate::decorate_sink;
use crate::sink::Sink;

use super::base::{answer_kind, remove_all_via_select, DaoCore};
use super::{Command, CmdOutcome, Dao};

pub struct MemoryDao {
    core: DaoCore,
    of: Arc<RecordClass>,
    records: Mutex<Vec<Value>>,
}

impl MemoryDao {
    pub fn new(of: Arc<RecordClass>) -> Self {
        Self {
            core: DaoCore::new(),
            of,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Index of the record whose primary key equals `key`.
    fn position_of(&self, records: &[Value], key: &Value) -> Option<usize> {
        records.iter().position(|r| {
            self.of
                .primary_key_value(r)
                .map(|k| deep_equals(&k, key))
                .unwrap_or(false)
        })
    }
}

#[async_trait]
impl Dao for MemoryDao {
    fn of(&self) -> Arc<RecordClass> {
        Arc::clone(&self.of)
    }

    fn uid(&self) -> u64 {
        self.core.uid()
    }

    fn kind(&self) -> &'static str {
        "ripple.dao.MemoryDao"
    }

    async fn put(&self, _x: &Context, record: Value) -> Result<Value> {
        let key = self.of.primary_key_value(&record)?;
        {
            let mut records = self.records.lock();
            match self.position_of(&records, &key) {
                Some(i) => records[i] = record.clone(),
                None => records.push(record.clone()),
            }
        }
        // Lock released before fan-out so listeners may re-enter.
        self.core.notify_put(&record);
        Ok(record)
    }

    async fn remove(&self, _x: &Context, record: Value) -> Result<()> {
        let key = self.of.primary_key_value(&record)?;
        let removed = {
            let mut records = self.records.lock();
            self.position_of(&records, &key).map(|i| records.remove(i))
        };
        if let Some(removed) = removed {
            self.core.notify_remove(&removed);
        }
        Ok(())
    }

    async fn find(&self, _x: &Context, id: &Value) -> Result<Option<Value>> {
        let records = self.records.lock();
        Ok(self.position_of(&records, id).map(|i| records[i].clone()))
    }

    async fn select(&self, _x: &Context, sink: Arc<dyn Sink>, spec: QuerySpec) -> Result<()> {
        let sink = decorate_sink(sink, &spec);
        let snapshot: Vec<Value> = self.records.lock().clone();
        for record in &snapshot {
            sink.put(record)?;
        }
        sink.eof()
    }

    async fn remove_all(&self, x: &Context, spec: QuerySpec) -> Result<()> {
        remove_all_via_select(self, x, spec).await
    }

    fn listen(
        &self,
        _x: &Context,
        sink: Arc<dyn Sink>,
        predicate: Option<Arc<dyn Predicate>>,
    ) -> Result<Subscription> {
        self.core.listen(sink, predicate)
    }

    async fn cmd(&self, _x: &Context, cmd: &Command) -> CmdOutcome {
        answer_kind(self.kind(), cmd)
    }
}
