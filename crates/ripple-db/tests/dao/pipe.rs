//! Tests for `pipe` — initial contents followed by live updates, with no
//! end-of-stream leaking to the consumer.

use std::sync::{Arc, Mutex};

use ripple_db::context::Context;
use ripple_db::dao::{Dao, DaoExt, MemoryDao};
use ripple_db::error::Result;
use ripple_db::query::predicate::gt;
use ripple_db::schema::RecordClass;
use ripple_db::sink::Sink;
use serde_json::{json, Value};

async fn seeded_dao(x: &Context) -> Arc<dyn Dao> {
    let dao: Arc<dyn Dao> = Arc::new(MemoryDao::new(Arc::new(RecordClass::new("item"))));
    for v in [1, 2, 3] {
        dao.put(x, json!({"id": format!("r{v}"), "value": v}))
            .await
            .unwrap();
    }
    dao
}

struct LogSink {
    log: Arc<Mutex<Vec<String>>>,
}

impl LogSink {
    fn new() -> (Arc<Self>, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (
            Arc::new(Self {
                log: Arc::clone(&log),
            }),
            log,
        )
    }
}

impl Sink for LogSink {
    fn put(&self, record: &Value) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("put:{}", record["id"].as_str().unwrap_or("?")));
        Ok(())
    }

    fn remove(&self, record: &Value) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("remove:{}", record["id"].as_str().unwrap_or("?")));
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        self.log.lock().unwrap().push("reset".into());
        Ok(())
    }

    fn eof(&self) -> Result<()> {
        self.log.lock().unwrap().push("eof".into());
        Ok(())
    }
}

#[tokio::test]
async fn pipe_delivers_current_contents_then_stays_live() {
    let x = Context::new();
    let dao = seeded_dao(&x).await;
    let (sink, log) = LogSink::new();

    let _sub = dao.pipe(&x, sink, None).await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["put:r1", "put:r2", "put:r3"]);

    dao.put(&x, json!({"id": "r4", "value": 4})).await.unwrap();
    dao.remove(&x, json!({"id": "r1"})).await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["put:r1", "put:r2", "put:r3", "put:r4", "remove:r1"]
    );
}

#[tokio::test]
async fn pipe_swallows_the_initial_eof() {
    let x = Context::new();
    let dao = seeded_dao(&x).await;
    let (sink, log) = LogSink::new();

    let _sub = dao.pipe(&x, sink, None).await.unwrap();
    assert!(!log.lock().unwrap().iter().any(|e| e == "eof"));
}

#[tokio::test]
async fn pipe_with_predicate_filters_the_initial_load_and_resets_after() {
    let x = Context::new();
    let dao = seeded_dao(&x).await;
    let (sink, log) = LogSink::new();

    let _sub = dao
        .pipe(&x, sink, Some(gt("value", json!(1))))
        .await
        .unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["put:r2", "put:r3"]);

    // Live updates under a predicate arrive as resets.
    dao.put(&x, json!({"id": "r9", "value": 9})).await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["put:r2", "put:r3", "reset"]);
}

#[tokio::test]
async fn detaching_a_pipe_stops_live_updates() {
    let x = Context::new();
    let dao = seeded_dao(&x).await;
    let (sink, log) = LogSink::new();

    let sub = dao.pipe(&x, sink, None).await.unwrap();
    sub.detach();

    dao.put(&x, json!({"id": "r4", "value": 4})).await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["put:r1", "put:r2", "put:r3"]);
}

#[tokio::test]
async fn pipe_through_a_filtered_view() {
    let x = Context::new();
    let dao = seeded_dao(&x).await;
    let (sink, log) = LogSink::new();

    // A filtered decorator contributes its predicate to both halves of
    // the pipe: the initial load is narrowed and live updates collapse
    // to resets.
    let filtered = dao.filter(gt("value", json!(2)));
    let _sub = filtered.pipe(&x, sink, None).await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["put:r3"]);

    dao.put(&x, json!({"id": "r5", "value": 5})).await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["put:r3", "reset"]);
}
