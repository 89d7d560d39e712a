//! Tests for the narrowing decorators and chain-order equivalence.

use std::sync::{Arc, Mutex};

use ripple_db::context::Context;
use ripple_db::dao::{Command, CmdOutcome, Dao, DaoExt, MemoryDao};
use ripple_db::error::Result;
use ripple_db::query::comparator::asc;
use ripple_db::query::predicate::gt;
use ripple_db::schema::RecordClass;
use ripple_db::sink::Sink;
use serde_json::{json, Value};

async fn seeded_dao(x: &Context) -> Arc<dyn Dao> {
    let dao: Arc<dyn Dao> = Arc::new(MemoryDao::new(Arc::new(RecordClass::new("item"))));
    for v in [5, 1, 4, 2, 3] {
        dao.put(x, json!({"id": format!("r{v}"), "value": v}))
            .await
            .unwrap();
    }
    dao
}

fn values(records: &[Value]) -> Vec<i64> {
    records.iter().map(|r| r["value"].as_i64().unwrap()).collect()
}

// ============================================================================
// Narrowing behavior
// ============================================================================

#[tokio::test]
async fn filter_narrows_select() {
    let x = Context::new();
    let dao = seeded_dao(&x).await;

    let result = dao
        .filter(gt("value", json!(3)))
        .select_array(&x)
        .await
        .unwrap();
    assert_eq!(values(&result), [5, 4]);
}

#[tokio::test]
async fn full_chain_matches_filter_sort_paginate() {
    let x = Context::new();
    let dao = seeded_dao(&x).await;

    let result = dao
        .filter(gt("value", json!(1)))
        .order_by(asc("value"))
        .skip(1)
        .limit(2)
        .select_array(&x)
        .await
        .unwrap();

    // [5,4,2,3] → [2,3,4,5] → skip 1 → limit 2.
    assert_eq!(values(&result), [3, 4]);
}

#[tokio::test]
async fn chain_order_does_not_change_the_result() {
    let x = Context::new();
    let dao = seeded_dao(&x).await;

    let a = dao
        .filter(gt("value", json!(1)))
        .order_by(asc("value"))
        .skip(1)
        .limit(2)
        .select_array(&x)
        .await
        .unwrap();

    let b = dao
        .limit(2)
        .skip(1)
        .order_by(asc("value"))
        .filter(gt("value", json!(1)))
        .select_array(&x)
        .await
        .unwrap();

    let c = dao
        .skip(1)
        .filter(gt("value", json!(1)))
        .limit(2)
        .order_by(asc("value"))
        .select_array(&x)
        .await
        .unwrap();

    assert_eq!(a, b);
    assert_eq!(a, c);
}

#[tokio::test]
async fn stacked_filters_conjoin() {
    let x = Context::new();
    let dao = seeded_dao(&x).await;

    let result = dao
        .filter(gt("value", json!(1)))
        .filter(gt("value", json!(3)))
        .select_array(&x)
        .await
        .unwrap();
    assert_eq!(values(&result), [5, 4]);
}

#[tokio::test]
async fn filtered_find_hides_records_outside_the_view() {
    let x = Context::new();
    let dao = seeded_dao(&x).await;
    let filtered = dao.filter(gt("value", json!(3)));

    let visible = filtered.find(&x, &json!("r5")).await.unwrap();
    assert!(visible.is_some());

    // r1 exists in the delegate but is outside the filtered view.
    assert!(filtered.find(&x, &json!("r1")).await.unwrap().is_none());
}

#[tokio::test]
async fn mutations_pass_through_decorators_unchanged() {
    let x = Context::new();
    let dao = seeded_dao(&x).await;
    let narrowed = dao.filter(gt("value", json!(100))).limit(1);

    // The new record does not match the filter, but put is not a query.
    narrowed
        .put(&x, json!({"id": "r9", "value": 9}))
        .await
        .unwrap();
    assert!(dao.find(&x, &json!("r9")).await.unwrap().is_some());

    narrowed.remove(&x, json!({"id": "r9"})).await.unwrap();
    assert!(dao.find(&x, &json!("r9")).await.unwrap().is_none());
}

#[tokio::test]
async fn remove_all_on_a_filtered_view_spares_the_rest() {
    let x = Context::new();
    let dao = seeded_dao(&x).await;

    dao.filter(gt("value", json!(3)))
        .remove_all(&x, ripple_db::query::spec::QuerySpec::new())
        .await
        .unwrap();

    let mut remaining = values(&dao.select_array(&x).await.unwrap());
    remaining.sort_unstable();
    assert_eq!(remaining, [1, 2, 3]);
}

// ============================================================================
// Listen through decorators
// ============================================================================

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

#[tokio::test]
async fn listen_on_a_filtered_view_collapses_to_resets() {
    let x = Context::new();
    let dao = seeded_dao(&x).await;
    let log = Arc::new(Mutex::new(Vec::new()));

    let _sub = dao
        .filter(gt("value", json!(3)))
        .listen(&x, Arc::new(LogSink { log: Arc::clone(&log) }), None)
        .unwrap();

    dao.put(&x, json!({"id": "r9", "value": 9})).await.unwrap();
    dao.put(&x, json!({"id": "r0", "value": 0})).await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["reset", "reset"]);
}

#[tokio::test]
async fn listen_on_a_skip_decorator_stays_precise() {
    let x = Context::new();
    let dao = seeded_dao(&x).await;
    let log = Arc::new(Mutex::new(Vec::new()));

    let _sub = dao
        .skip(2)
        .listen(&x, Arc::new(LogSink { log: Arc::clone(&log) }), None)
        .unwrap();

    dao.put(&x, json!({"id": "r9", "value": 9})).await.unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["put:r9"]);
}

// ============================================================================
// Command fall-through
// ============================================================================

#[tokio::test]
async fn cmd_falls_through_the_chain_to_the_leaf() {
    let x = Context::new();
    let dao = seeded_dao(&x).await;
    let chain = dao.filter(gt("value", json!(1))).limit(2);

    assert_eq!(
        chain.cmd(&x, &Command::parse("CLASS? ripple.dao.LimitedDao")).await,
        CmdOutcome::Handled(json!(true))
    );
    assert_eq!(
        chain.cmd(&x, &Command::parse("CLASS? ripple.dao.FilteredDao")).await,
        CmdOutcome::Handled(json!(true))
    );
    assert_eq!(
        chain.cmd(&x, &Command::parse("CLASS? ripple.dao.MemoryDao")).await,
        CmdOutcome::Handled(json!(true))
    );
    assert_eq!(
        chain.cmd(&x, &Command::parse("CLASS? ripple.dao.ProxyDao")).await,
        CmdOutcome::NotHandled
    );
}

#[tokio::test]
async fn decorators_report_the_delegates_record_class() {
    let x = Context::new();
    let dao = seeded_dao(&x).await;
    let chain = dao.filter(gt("value", json!(1))).limit(2);
    assert_eq!(chain.of().name(), "item");
}
