use std::sync::atomic::{AtomicUsize, Ordering};

use workbridge_storage::conformance::run_conformance_suite;
use workbridge_storage::{MemoryStore, MongoConnector, SqliteConnector, StoreConnector};

#[tokio::test]
async fn memory_store_passes_conformance() {
    let report = run_conformance_suite(|| async {
        MemoryStore::new().open().await.expect("open memory store")
    })
    .await;
    assert!(report.total > 0);
    assert_eq!(report.failed, 0, "{report}");
}

#[tokio::test]
async fn sqlite_store_passes_conformance() {
    let dir = tempfile::tempdir().unwrap();
    let counter = AtomicUsize::new(0);

    let report = run_conformance_suite(|| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        let path = dir.path().join(format!("store-{n}.db"));
        async move {
            SqliteConnector::new(path, "work_orders")
                .expect("valid collection name")
                .open()
                .await
                .expect("open sqlite store")
        }
    })
    .await;
    assert!(report.total > 0);
    assert_eq!(report.failed, 0, "{report}");
}

/// Needs a running server: `WORKBRIDGE_TEST_MONGO_URI=mongodb://localhost:27017
/// cargo test -p workbridge-storage -- --ignored`. Each test gets its own
/// collection in a throwaway database.
#[tokio::test]
#[ignore = "requires WORKBRIDGE_TEST_MONGO_URI"]
async fn mongo_store_passes_conformance() {
    let Ok(uri) = std::env::var("WORKBRIDGE_TEST_MONGO_URI") else {
        eprintln!("WORKBRIDGE_TEST_MONGO_URI not set, skipping");
        return;
    };
    let database = format!("workbridge_conformance_{}", std::process::id());
    let counter = AtomicUsize::new(0);

    let report = run_conformance_suite(|| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        let connector = MongoConnector::new(&uri, &format!("work_orders_{n}"))
            .expect("valid collection name")
            .with_database(database.clone());
        async move { connector.open().await.expect("open mongo store") }
    })
    .await;
    assert!(report.total > 0);
    assert_eq!(report.failed, 0, "{report}");
}
