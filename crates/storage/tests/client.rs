use std::time::Duration;

use time::macros::datetime;
use workbridge_core::{InternalWorkOrder, Status};
use workbridge_storage::{
    ClientError, ConnectionState, MemoryStore, RetryPolicy, SqliteConnector, StorageError,
    StoreClient, UpsertOutcome, UNSYNCED_PAGE_SIZE,
};

fn client(store: &MemoryStore) -> StoreClient<MemoryStore> {
    StoreClient::new(store.clone())
        .with_connect_policy(RetryPolicy::immediate(3))
        .with_write_policy(RetryPolicy::immediate(3))
}

fn order(number: i64, status: Status, title: &str) -> InternalWorkOrder {
    InternalWorkOrder {
        number,
        status,
        title: title.to_string(),
        description: format!("{title} description"),
        deleted: false,
        created_at: datetime!(2025-05-01 08:00:00 UTC),
        updated_at: datetime!(2025-05-01 08:00:00 UTC),
        deleted_at: None,
        is_synced: false,
        synced_at: None,
    }
}

// ── connect ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn connect_moves_through_states() {
    let store = MemoryStore::new();
    let client = client(&store);
    assert_eq!(client.state(), ConnectionState::Disconnected);

    let session = client.connect().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);

    session.close().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn dropping_session_disconnects() {
    let store = MemoryStore::new();
    let client = client(&store);
    {
        let _session = client.connect().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Connected);
    }
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn connect_retries_transient_failures() {
    let store = MemoryStore::new();
    store.fail_next_connects(2);
    let client = client(&store);

    let session = client.connect().await.unwrap();
    session.close().await;
    assert_eq!(store.stats().connects, 1);
}

#[tokio::test]
async fn connect_gives_up_after_three_attempts() {
    let store = MemoryStore::new();
    store.fail_next_connects(3);
    let client = client(&store);

    match client.connect().await {
        Err(ClientError::Connect {
            attempts, target, ..
        }) => {
            assert_eq!(attempts, 3);
            assert_eq!(target, "memory://");
        }
        Ok(_) => panic!("expected connect failure"),
        Err(other) => panic!("unexpected error: {other}"),
    }
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(store.stats().connects, 0);
}

#[tokio::test]
async fn connect_waits_between_attempts() {
    let store = MemoryStore::new();
    store.fail_next_connects(1);
    let client = StoreClient::new(store.clone())
        .with_connect_policy(RetryPolicy::new(3, Duration::from_millis(50)));

    let started = std::time::Instant::now();
    let session = client.connect().await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(50));
    session.close().await;
}

#[tokio::test]
async fn connect_to_unreachable_sqlite_fails() {
    let dir = tempfile::tempdir().unwrap();
    let connector =
        SqliteConnector::new(dir.path().join("missing/dir/store.db"), "work_orders").unwrap();
    let client = StoreClient::new(connector).with_connect_policy(RetryPolicy::immediate(2));

    let err = client.connect().await.err().expect("connect should fail");
    match err {
        ClientError::Connect { attempts, .. } => assert_eq!(attempts, 2),
        other => panic!("unexpected error: {other}"),
    }
}

// ── upsert ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_inserts_new_work_order_unsynced() {
    let store = MemoryStore::new();
    let client = client(&store);
    let session = client.connect().await.unwrap();

    let outcome = session
        .upsert(&order(101, Status::Pending, "Fix pump"))
        .await
        .unwrap();
    assert!(matches!(outcome, UpsertOutcome::Inserted(_)));
    session.close().await;

    let doc = store.get(101).unwrap();
    assert!(!doc.order.is_synced);
    assert_eq!(doc.order.title, "Fix pump");
    // createdAt and updatedAt are stamped by the client, not copied
    assert!(doc.order.created_at > datetime!(2025-05-01 08:00:00 UTC));
    assert_eq!(doc.order.created_at, doc.order.updated_at);
}

#[tokio::test]
async fn upsert_same_order_twice_writes_once() {
    let store = MemoryStore::new();
    let client = client(&store);
    let session = client.connect().await.unwrap();

    let wo = order(101, Status::Pending, "Fix pump");
    session.upsert(&wo).await.unwrap();
    let second = session.upsert(&wo).await.unwrap();
    session.close().await;

    assert_eq!(second, UpsertOutcome::Unchanged);
    let stats = store.stats();
    assert_eq!(stats.inserts, 1);
    assert_eq!(stats.updates, 0);
    assert_eq!(store.documents().len(), 1);
}

#[tokio::test]
async fn upsert_updates_changed_fields_and_keeps_created_at() {
    let store = MemoryStore::new();
    let mut existing = order(102, Status::Pending, "Old title");
    existing.is_synced = true;
    existing.synced_at = Some(datetime!(2025-05-02 00:00:00 UTC));
    let id = store.seed(existing.clone());

    let client = client(&store);
    let session = client.connect().await.unwrap();
    let mut incoming = order(102, Status::Completed, "New title");
    incoming.created_at = datetime!(2030-01-01 00:00:00 UTC);
    let outcome = session.upsert(&incoming).await.unwrap();
    session.close().await;

    assert_eq!(outcome, UpsertOutcome::Updated);
    let doc = store.get(102).unwrap();
    assert_eq!(doc.id, id);
    assert_eq!(doc.order.status, Status::Completed);
    assert_eq!(doc.order.title, "New title");
    assert_eq!(doc.order.created_at, existing.created_at);
    assert!(doc.order.updated_at > existing.updated_at);
    assert!(!doc.order.is_synced);
    assert_eq!(store.stats().updates, 1);
}

#[tokio::test]
async fn upsert_retries_transient_write_failures() {
    let store = MemoryStore::new();
    store.fail_next_writes(2);
    let client = client(&store);
    let session = client.connect().await.unwrap();

    let outcome = session
        .upsert(&order(5, Status::Pending, "Retry me"))
        .await
        .unwrap();
    session.close().await;

    assert!(matches!(outcome, UpsertOutcome::Inserted(_)));
    assert_eq!(store.stats().inserts, 1);
}

#[tokio::test]
async fn upsert_reports_error_after_exhausting_retries() {
    let store = MemoryStore::new();
    store.fail_next_writes(3);
    let client = client(&store);
    let session = client.connect().await.unwrap();

    let err = session
        .upsert(&order(6, Status::Pending, "Never lands"))
        .await
        .unwrap_err();
    match err {
        ClientError::Upsert {
            number,
            attempts,
            source,
        } => {
            assert_eq!(number, 6);
            assert_eq!(attempts, 3);
            assert!(matches!(source, StorageError::Unavailable(_)));
        }
        other => panic!("unexpected error: {other}"),
    }

    // Each upsert has its own attempt budget.
    let outcome = session
        .upsert(&order(6, Status::Pending, "Lands now"))
        .await
        .unwrap();
    session.close().await;
    assert!(matches!(outcome, UpsertOutcome::Inserted(_)));
}

// ── fetch / mark ────────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_unsynchronized_is_capped_at_one_page() {
    let store = MemoryStore::new();
    for n in 1..=(UNSYNCED_PAGE_SIZE as i64 + 20) {
        store.seed(order(n, Status::Pending, "bulk"));
    }
    let client = client(&store);
    let session = client.connect().await.unwrap();

    let docs = session.fetch_unsynchronized().await;
    session.close().await;
    assert_eq!(docs.len(), UNSYNCED_PAGE_SIZE);
    assert_eq!(docs[0].order.number, 1);
}

#[tokio::test]
async fn fetch_unsynchronized_swallows_query_errors() {
    let store = MemoryStore::new();
    store.seed(order(1, Status::Pending, "hidden"));
    let client = client(&store);
    let session = client.connect().await.unwrap();

    store.fail_next_reads(1);
    assert!(session.fetch_unsynchronized().await.is_empty());
    assert_eq!(session.fetch_unsynchronized().await.len(), 1);
    session.close().await;
}

#[tokio::test]
async fn mark_synced_flags_document() {
    let store = MemoryStore::new();
    let id = store.seed(order(202, Status::Completed, "Done"));
    let client = client(&store);
    let session = client.connect().await.unwrap();

    assert!(session.mark_synced(&id).await);
    assert!(session.fetch_unsynchronized().await.is_empty());
    session.close().await;

    let doc = store.get(202).unwrap();
    assert!(doc.order.is_synced);
    assert!(doc.order.synced_at.is_some());
}

#[tokio::test]
async fn mark_synced_failure_returns_false() {
    let store = MemoryStore::new();
    let id = store.seed(order(203, Status::Pending, "Stays"));
    let client = client(&store);
    let session = client.connect().await.unwrap();

    store.fail_next_marks(1);
    assert!(!session.mark_synced(&id).await);
    assert!(!session.mark_synced(&workbridge_storage::DocumentId::generate()).await);
    session.close().await;

    assert!(!store.get(203).unwrap().order.is_synced);
}
