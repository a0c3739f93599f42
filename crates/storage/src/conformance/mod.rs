//! Conformance test suite for `DocumentStore` implementations.
//!
//! This module provides a backend-agnostic test suite that any
//! `DocumentStore` implementation can run to verify correctness. The suite
//! covers:
//!
//! - **Writes**: insert identity assignment, `number` uniqueness, replace
//! - **Reads**: lookup by number, the unsynced filter, limits and ordering
//! - **Sync marks**: `set_synced` and how it interacts with later writes
//! - **Lifecycle**: ping, close, timestamp fidelity
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! opens a fresh, empty store handle for each test:
//!
//! ```ignore
//! use workbridge_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn memory_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         MemoryStore::new().open().await.unwrap()
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod lifecycle;
mod read;
mod sync;
mod write;

use std::fmt;
use std::future::Future;

use time::macros::datetime;
use workbridge_core::{InternalWorkOrder, Status};

use crate::DocumentStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "write", "read", "sync").
    pub category: String,
    /// Test name (e.g. "insert_rejects_duplicate_number").
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` function is called once per test to open a fresh, empty
/// store handle, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: DocumentStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(write::run_write_tests(&factory).await);
    results.extend(read::run_read_tests(&factory).await);
    results.extend(sync::run_sync_tests(&factory).await);
    results.extend(lifecycle::run_lifecycle_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// A whole-second, unsynced work order so backends that store timestamps
/// as text compare equal after a round trip.
fn make_order(number: i64) -> InternalWorkOrder {
    InternalWorkOrder {
        number,
        status: Status::Pending,
        title: format!("Work order {number}"),
        description: String::new(),
        deleted: false,
        created_at: datetime!(2025-01-01 00:00:00 UTC),
        updated_at: datetime!(2025-01-01 00:00:00 UTC),
        deleted_at: None,
        is_synced: false,
        synced_at: None,
    }
}

fn ensure(condition: bool, msg: impl FnOnce() -> String) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(msg())
    }
}
