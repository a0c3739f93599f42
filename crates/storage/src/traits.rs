use async_trait::async_trait;
use time::OffsetDateTime;
use workbridge_core::InternalWorkOrder;

use crate::error::StorageError;
use crate::record::{DocumentId, StoredWorkOrder};

/// An open handle on the work-order collection of a document store.
///
/// One document per work order, unique on `number`. A handle is obtained
/// from a [`StoreConnector`] at the start of a sync cycle and closed at its
/// end; every operation on a closed handle returns
/// `Err(StorageError::Closed)`.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` so handles can be used across
/// async task boundaries.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Cheap round trip proving the store is reachable.
    async fn ping(&self) -> Result<(), StorageError>;

    /// Look up a document by its business key.
    async fn find_by_number(&self, number: i64) -> Result<Option<StoredWorkOrder>, StorageError>;

    /// Documents with `isSynced == false`, in insertion order.
    ///
    /// `limit` caps the number of results (0 = no limit).
    async fn find_unsynced(&self, limit: usize) -> Result<Vec<StoredWorkOrder>, StorageError>;

    /// Insert a new document and return its assigned identity.
    ///
    /// Returns `Err(StorageError::DuplicateNumber)` if a document with the
    /// same `number` exists.
    async fn insert(&self, order: &InternalWorkOrder) -> Result<DocumentId, StorageError>;

    /// Replace the document whose `number` matches `order.number`, keeping
    /// its identity.
    ///
    /// Returns the number of documents modified (0 when none matched).
    async fn replace(&self, order: &InternalWorkOrder) -> Result<u64, StorageError>;

    /// Set `isSynced = true` and `syncedAt = at` on the document with `id`.
    ///
    /// Returns the number of documents modified (0 when none matched).
    async fn set_synced(&self, id: &DocumentId, at: OffsetDateTime) -> Result<u64, StorageError>;

    /// Release the handle. Further calls fail with `StorageError::Closed`.
    async fn close(&self) -> Result<(), StorageError>;
}

/// Opens [`DocumentStore`] handles for one configured store.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    type Store: DocumentStore;

    /// Human-readable target for logs.
    fn describe(&self) -> String;

    /// Open a new handle.
    async fn open(&self) -> Result<Self::Store, StorageError>;
}
