use std::future::Future;

use super::{ensure, make_order, TestResult};
use crate::DocumentStore;

pub(super) async fn run_read_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "read",
            "find_missing_number_returns_none",
            find_missing_number_returns_none(factory).await,
        ),
        TestResult::from_result(
            "read",
            "unsynced_excludes_synced_documents",
            unsynced_excludes_synced_documents(factory).await,
        ),
        TestResult::from_result(
            "read",
            "unsynced_respects_limit",
            unsynced_respects_limit(factory).await,
        ),
        TestResult::from_result(
            "read",
            "unsynced_zero_limit_is_unbounded",
            unsynced_zero_limit_is_unbounded(factory).await,
        ),
        TestResult::from_result(
            "read",
            "unsynced_in_insertion_order",
            unsynced_in_insertion_order(factory).await,
        ),
    ]
}

async fn find_missing_number_returns_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let found = s.find_by_number(1).await.map_err(|e| e.to_string())?;
    ensure(found.is_none(), || format!("expected None, got {found:?}"))
}

async fn unsynced_excludes_synced_documents<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut synced = make_order(1);
    synced.is_synced = true;
    s.insert(&synced).await.map_err(|e| e.to_string())?;
    s.insert(&make_order(2)).await.map_err(|e| e.to_string())?;

    let docs = s.find_unsynced(0).await.map_err(|e| e.to_string())?;
    let numbers: Vec<i64> = docs.iter().map(|d| d.order.number).collect();
    ensure(numbers == vec![2], || format!("expected [2], got {numbers:?}"))
}

async fn unsynced_respects_limit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for n in 1..=5 {
        s.insert(&make_order(n)).await.map_err(|e| e.to_string())?;
    }
    let docs = s.find_unsynced(3).await.map_err(|e| e.to_string())?;
    ensure(docs.len() == 3, || format!("expected 3 documents, got {}", docs.len()))
}

async fn unsynced_zero_limit_is_unbounded<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for n in 1..=150 {
        s.insert(&make_order(n)).await.map_err(|e| e.to_string())?;
    }
    let docs = s.find_unsynced(0).await.map_err(|e| e.to_string())?;
    ensure(docs.len() == 150, || {
        format!("expected 150 documents, got {}", docs.len())
    })
}

async fn unsynced_in_insertion_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for n in [30, 10, 20] {
        s.insert(&make_order(n)).await.map_err(|e| e.to_string())?;
    }
    let docs = s.find_unsynced(0).await.map_err(|e| e.to_string())?;
    let numbers: Vec<i64> = docs.iter().map(|d| d.order.number).collect();
    ensure(numbers == vec![30, 10, 20], || {
        format!("expected insertion order [30, 10, 20], got {numbers:?}")
    })
}
