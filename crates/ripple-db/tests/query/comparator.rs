//! Tests for record orderings.

use ripple_db::query::comparator::{asc, chain, desc, ReverseOrder};
use ripple_db::query::Comparator;
use serde_json::{json, Value};
use std::cmp::Ordering;

fn users() -> Vec<Value> {
    vec![
        json!({"id": "1", "name": "Alice",   "age": 30, "score": 85}),
        json!({"id": "2", "name": "Bob",     "age": 25, "score": 90}),
        json!({"id": "3", "name": "Charlie", "age": 35, "score": 75}),
        json!({"id": "4", "name": "Diana",   "age": 28, "score": 90}),
        json!({"id": "5", "name": "Eve",     "age": 30, "score": 80}),
    ]
}

fn sorted_by(cmp: &dyn Comparator, mut records: Vec<Value>) -> Vec<Value> {
    records.sort_by(|a, b| cmp.compare(a, b));
    records
}

fn names(records: &[Value]) -> Vec<&str> {
    records.iter().map(|r| r["name"].as_str().unwrap()).collect()
}

#[test]
fn asc_sorts_strings() {
    let result = sorted_by(asc("name").as_ref(), users());
    assert_eq!(names(&result), ["Alice", "Bob", "Charlie", "Diana", "Eve"]);
}

#[test]
fn desc_sorts_numbers() {
    let result = sorted_by(desc("age").as_ref(), users());
    let ages: Vec<i64> = result.iter().map(|r| r["age"].as_i64().unwrap()).collect();
    assert_eq!(ages, [35, 30, 30, 28, 25]);
}

#[test]
fn chain_breaks_ties_with_later_comparators() {
    let cmp = chain(vec![desc("score"), asc("name")]);
    let result = sorted_by(cmp.as_ref(), users());
    // score 90: Bob before Diana; then 85, 80, 75.
    assert_eq!(names(&result), ["Bob", "Diana", "Alice", "Eve", "Charlie"]);
}

#[test]
fn reverse_inverts_an_ordering() {
    let cmp = ReverseOrder::new(asc("age"));
    assert_eq!(
        cmp.compare(&json!({"age": 1}), &json!({"age": 2})),
        Ordering::Greater
    );
}

#[test]
fn missing_field_sorts_to_end() {
    let cmp = asc("age");
    let mut records = vec![json!({"id": "a"}), json!({"id": "b", "age": 99})];
    records.sort_by(|a, b| cmp.compare(a, b));
    assert_eq!(records[0]["id"], json!("b"));
}
