use std::future::Future;

use workbridge_core::Status;

use super::{ensure, make_order, TestResult};
use crate::{DocumentStore, StorageError};

pub(super) async fn run_write_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "write",
            "insert_then_find_by_number",
            insert_then_find_by_number(factory).await,
        ),
        TestResult::from_result(
            "write",
            "insert_assigns_distinct_ids",
            insert_assigns_distinct_ids(factory).await,
        ),
        TestResult::from_result(
            "write",
            "insert_rejects_duplicate_number",
            insert_rejects_duplicate_number(factory).await,
        ),
        TestResult::from_result(
            "write",
            "replace_overwrites_fields_and_keeps_id",
            replace_overwrites_fields_and_keeps_id(factory).await,
        ),
        TestResult::from_result(
            "write",
            "replace_missing_number_modifies_nothing",
            replace_missing_number_modifies_nothing(factory).await,
        ),
    ]
}

async fn insert_then_find_by_number<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let order = make_order(101);
    let id = s.insert(&order).await.map_err(|e| e.to_string())?;
    let found = s
        .find_by_number(101)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("inserted work order not found")?;
    ensure(found.id == id, || format!("expected id {id}, got {}", found.id))?;
    ensure(found.order == order, || {
        format!("stored document differs: {:?}", found.order)
    })
}

async fn insert_assigns_distinct_ids<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let a = s.insert(&make_order(1)).await.map_err(|e| e.to_string())?;
    let b = s.insert(&make_order(2)).await.map_err(|e| e.to_string())?;
    ensure(a != b, || format!("both inserts got id {a}"))
}

async fn insert_rejects_duplicate_number<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert(&make_order(7)).await.map_err(|e| e.to_string())?;
    match s.insert(&make_order(7)).await {
        Err(StorageError::DuplicateNumber { number: 7 }) => Ok(()),
        other => Err(format!("expected DuplicateNumber {{ number: 7 }}, got {other:?}")),
    }
}

async fn replace_overwrites_fields_and_keeps_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = s.insert(&make_order(5)).await.map_err(|e| e.to_string())?;

    let mut changed = make_order(5);
    changed.status = Status::OnHold;
    changed.title = "Replaced".to_string();
    changed.deleted = true;
    let modified = s.replace(&changed).await.map_err(|e| e.to_string())?;
    ensure(modified == 1, || format!("expected 1 modified, got {modified}"))?;

    let found = s
        .find_by_number(5)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("replaced work order not found")?;
    ensure(found.id == id, || format!("id changed from {id} to {}", found.id))?;
    ensure(found.order == changed, || {
        format!("stored document differs: {:?}", found.order)
    })
}

async fn replace_missing_number_modifies_nothing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let modified = s.replace(&make_order(404)).await.map_err(|e| e.to_string())?;
    ensure(modified == 0, || format!("expected 0 modified, got {modified}"))?;
    let found = s.find_by_number(404).await.map_err(|e| e.to_string())?;
    ensure(found.is_none(), || "replace must not insert".to_string())
}
