//! Inert leaf DAO.
//!
//! Stores nothing and finds nothing. Useful as a placeholder delegate for
//! a [`super::ProxyDao`] that has not been pointed at a real store yet.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::Context;
use crate::error::Result;
use crate::query::predicate::Predicate;
use crate::query::spec::QuerySpec;
use crate::reactive::registry::Subscription;
use crate::schema::RecordClass;
use crate::sink::Sink;

use super::base::{answer_kind, DaoCore};
use super::{Command, CmdOutcome, Dao};

pub struct NullDao {
    core: DaoCore,
    of: Arc<RecordClass>,
}

impl NullDao {
    pub fn new(of: Arc<RecordClass>) -> Self {
        Self {
            core: DaoCore::new(),
            of,
        }
    }
}

#[async_trait]
impl Dao for NullDao {
    fn of(&self) -> Arc<RecordClass> {
        Arc::clone(&self.of)
    }

    fn uid(&self) -> u64 {
        self.core.uid()
    }

    fn kind(&self) -> &'static str {
        "ripple.dao.NullDao"
    }

    /// Echoes the record back without storing it.
    async fn put(&self, _x: &Context, record: Value) -> Result<Value> {
        self.core.notify_put(&record);
        Ok(record)
    }

    async fn remove(&self, _x: &Context, record: Value) -> Result<()> {
        self.core.notify_remove(&record);
        Ok(())
    }

    async fn find(&self, _x: &Context, _id: &Value) -> Result<Option<Value>> {
        Ok(None)
    }

    async fn select(&self, _x: &Context, sink: Arc<dyn Sink>, _spec: QuerySpec) -> Result<()> {
        sink.eof()
    }

    async fn remove_all(&self, _x: &Context, _spec: QuerySpec) -> Result<()> {
        Ok(())
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
