use std::future::Future;

use time::macros::datetime;

use super::{ensure, make_order, TestResult};
use crate::{DocumentStore, StorageError};

pub(super) async fn run_lifecycle_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result("lifecycle", "ping_open_store", ping_open_store(factory).await),
        TestResult::from_result(
            "lifecycle",
            "closed_store_rejects_operations",
            closed_store_rejects_operations(factory).await,
        ),
        TestResult::from_result(
            "lifecycle",
            "timestamps_survive_round_trip",
            timestamps_survive_round_trip(factory).await,
        ),
    ]
}

async fn ping_open_store<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.ping().await.map_err(|e| e.to_string())
}

async fn closed_store_rejects_operations<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.close().await.map_err(|e| e.to_string())?;
    match s.find_by_number(1).await {
        Err(StorageError::Closed) => {}
        other => return Err(format!("expected Closed from find_by_number, got {other:?}")),
    }
    match s.insert(&make_order(1)).await {
        Err(StorageError::Closed) => Ok(()),
        other => Err(format!("expected Closed from insert, got {other:?}")),
    }
}

async fn timestamps_survive_round_trip<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut order = make_order(9);
    order.created_at = datetime!(2025-05-01 22:36:24.105812 UTC);
    order.updated_at = datetime!(2025-05-02 08:00:00 +02:00);
    order.deleted = true;
    order.deleted_at = Some(datetime!(2025-05-03 00:00:00 UTC));
    s.insert(&order).await.map_err(|e| e.to_string())?;

    let found = s
        .find_by_number(9)
        .await
        .map_err(|e| e.to_string())?
        .ok_or("work order not found")?;
    ensure(found.order.created_at == order.created_at, || {
        format!("createdAt {} != {}", found.order.created_at, order.created_at)
    })?;
    ensure(found.order.updated_at == order.updated_at, || {
        format!("updatedAt {} != {}", found.order.updated_at, order.updated_at)
    })?;
    ensure(found.order.deleted_at == order.deleted_at, || {
        format!("deletedAt {:?} != {:?}", found.order.deleted_at, order.deleted_at)
    })
}
