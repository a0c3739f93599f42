use std::future::Future;

use time::macros::datetime;

use super::{ensure, make_order, TestResult};
use crate::{DocumentId, DocumentStore};

pub(super) async fn run_sync_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "sync",
            "set_synced_flags_document",
            set_synced_flags_document(factory).await,
        ),
        TestResult::from_result(
            "sync",
            "set_synced_hides_from_unsynced",
            set_synced_hides_from_unsynced(factory).await,
        ),
        TestResult::from_result(
            "sync",
            "set_synced_unknown_id_modifies_nothing",
            set_synced_unknown_id_modifies_nothing(factory).await,
        ),
        TestResult::from_result(
            "sync",
            "unsynced_replace_resurfaces_document",
            unsynced_replace_resurfaces_document(factory).await,
        ),
    ]
}

async fn set_synced_flags_document<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = s.insert(&make_order(202)).await.map_err(|e| e.to_string())?;
    let at = datetime!(2025-06-01 12:30:00 UTC);
    let modified = s.set_synced(&id, at).await.map_err(|e| e.to_string())?;
    ensure(modified == 1, || format!("expected 1 modified, got {modified}"))?;

    let found = s
        .find_by_number(202)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("work order not found after set_synced")?;
    ensure(found.order.is_synced, || "isSynced not set".to_string())?;
    ensure(found.order.synced_at == Some(at), || {
        format!("expected syncedAt {at}, got {:?}", found.order.synced_at)
    })?;
    ensure(found.order.title == "Work order 202", || {
        format!("set_synced changed other fields: {:?}", found.order)
    })
}

async fn set_synced_hides_from_unsynced<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = s.insert(&make_order(1)).await.map_err(|e| e.to_string())?;
    s.insert(&make_order(2)).await.map_err(|e| e.to_string())?;
    s.set_synced(&id, datetime!(2025-06-01 00:00:00 UTC))
        .await
        .map_err(|e| e.to_string())?;

    let docs = s.find_unsynced(0).await.map_err(|e| e.to_string())?;
    let numbers: Vec<i64> = docs.iter().map(|d| d.order.number).collect();
    ensure(numbers == vec![2], || format!("expected [2], got {numbers:?}"))
}

async fn set_synced_unknown_id_modifies_nothing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.insert(&make_order(1)).await.map_err(|e| e.to_string())?;
    let modified = s
        .set_synced(&DocumentId::generate(), datetime!(2025-06-01 00:00:00 UTC))
        .await
        .map_err(|e| e.to_string())?;
    ensure(modified == 0, || format!("expected 0 modified, got {modified}"))
}

async fn unsynced_replace_resurfaces_document<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let id = s.insert(&make_order(3)).await.map_err(|e| e.to_string())?;
    s.set_synced(&id, datetime!(2025-06-01 00:00:00 UTC))
        .await
        .map_err(|e| e.to_string())?;

    let mut changed = make_order(3);
    changed.title = "Changed again".to_string();
    s.replace(&changed).await.map_err(|e| e.to_string())?;

    let docs = s.find_unsynced(0).await.map_err(|e| e.to_string())?;
    ensure(docs.len() == 1 && docs[0].id == id, || {
        format!("expected document {id} to be unsynced again, got {docs:?}")
    })
}
