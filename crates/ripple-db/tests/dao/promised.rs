//! Tests for the deferred-delegate DAO — ordered replay and cancel-safe
//! subscriptions.

use std::sync::{Arc, Mutex};

use ripple_db::context::Context;
use ripple_db::dao::{Dao, DaoExt, MemoryDao, PromisedDao};
use ripple_db::error::{DaoError, Result};
use ripple_db::schema::RecordClass;
use ripple_db::sink::Sink;
use serde_json::{json, Value};

fn promised() -> (Arc<PromisedDao>, Arc<dyn Dao>) {
    let promised = Arc::new(PromisedDao::new(Arc::new(RecordClass::new("user"))));
    let as_dao: Arc<dyn Dao> = Arc::clone(&promised) as Arc<dyn Dao>;
    (promised, as_dao)
}

fn memory_dao() -> Arc<dyn Dao> {
    Arc::new(MemoryDao::new(Arc::new(RecordClass::new("user"))))
}

struct LogSink {
    log: Arc<Mutex<Vec<String>>>,
}

impl Sink for LogSink {
    fn put(&self, record: &Value) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("put:{}", record["id"].as_str().unwrap_or("?")));
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        self.log.lock().unwrap().push("reset".into());
        Ok(())
    }
}

// ============================================================================
// Ordered replay
// ============================================================================

#[tokio::test]
async fn puts_issued_before_resolution_replay_in_issuance_order() {
    let x = Context::new();
    let (promised, dao) = promised();
    let store = memory_dao();

    // Issue three puts before the delegate exists. Each task parks on its
    // reply channel once the operation is enqueued; yielding after each
    // spawn pins the enqueue order.
    let mut handles = Vec::new();
    for i in 1..=3 {
        let dao = Arc::clone(&dao);
        let x = x.clone();
        handles.push(tokio::spawn(async move {
            dao.put(&x, json!({"id": format!("r{i}"), "seq": i})).await
        }));
        tokio::task::yield_now().await;
    }

    promised.resolve(Arc::clone(&store)).await.unwrap();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let seqs: Vec<i64> = store
        .select_array(&x)
        .await
        .unwrap()
        .iter()
        .map(|r| r["seq"].as_i64().unwrap())
        .collect();
    assert_eq!(seqs, [1, 2, 3]);
}

#[tokio::test]
async fn queued_find_answers_against_the_resolved_delegate() {
    let x = Context::new();
    let (promised, dao) = promised();
    let store = memory_dao();
    store.put(&x, json!({"id": "r1", "name": "Ada"})).await.unwrap();

    let find = {
        let dao = Arc::clone(&dao);
        let x = x.clone();
        tokio::spawn(async move { dao.find(&x, &json!("r1")).await })
    };
    tokio::task::yield_now().await;

    promised.resolve(store).await.unwrap();

    let found = find.await.unwrap().unwrap().unwrap();
    assert_eq!(found["name"], json!("Ada"));
}

#[tokio::test]
async fn operations_after_resolution_run_directly() {
    let x = Context::new();
    let (promised, dao) = promised();
    promised.resolve(memory_dao()).await.unwrap();

    dao.put(&x, json!({"id": "r1"})).await.unwrap();
    assert_eq!(dao.select_array(&x).await.unwrap().len(), 1);
}

#[tokio::test]
async fn resolving_twice_is_an_error() {
    let (promised, _dao) = promised();
    promised.resolve(memory_dao()).await.unwrap();

    let err = promised.resolve(memory_dao()).await.unwrap_err();
    assert!(matches!(err, DaoError::AlreadyResolved));
}

// ============================================================================
// listen before resolution
// ============================================================================

#[tokio::test]
async fn listen_before_resolution_attaches_on_resolve() {
    let x = Context::new();
    let (promised, dao) = promised();
    let store = memory_dao();
    let log = Arc::new(Mutex::new(Vec::new()));

    let _sub = dao
        .listen(&x, Arc::new(LogSink { log: Arc::clone(&log) }), None)
        .unwrap();
    promised.resolve(Arc::clone(&store)).await.unwrap();

    store.put(&x, json!({"id": "r1"})).await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["put:r1"]);
}

#[tokio::test]
async fn detach_before_resolution_means_zero_events_ever() {
    let x = Context::new();
    let (promised, dao) = promised();
    let store = memory_dao();
    let log = Arc::new(Mutex::new(Vec::new()));

    let sub = dao
        .listen(&x, Arc::new(LogSink { log: Arc::clone(&log) }), None)
        .unwrap();
    sub.detach();

    promised.resolve(Arc::clone(&store)).await.unwrap();
    store.put(&x, json!({"id": "r1"})).await.unwrap();

    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn detach_is_idempotent_across_resolution() {
    let x = Context::new();
    let (promised, dao) = promised();
    let store = memory_dao();
    let log = Arc::new(Mutex::new(Vec::new()));

    let sub = dao
        .listen(&x, Arc::new(LogSink { log: Arc::clone(&log) }), None)
        .unwrap();
    sub.detach();
    promised.resolve(Arc::clone(&store)).await.unwrap();
    sub.detach();

    store.put(&x, json!({"id": "r1"})).await.unwrap();
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn detach_after_resolution_stops_delivery() {
    let x = Context::new();
    let (promised, dao) = promised();
    let store = memory_dao();
    let log = Arc::new(Mutex::new(Vec::new()));

    let sub = dao
        .listen(&x, Arc::new(LogSink { log: Arc::clone(&log) }), None)
        .unwrap();
    promised.resolve(Arc::clone(&store)).await.unwrap();

    store.put(&x, json!({"id": "r1"})).await.unwrap();
    sub.detach();
    store.put(&x, json!({"id": "r2"})).await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["put:r1"]);
}
