/// All errors that can be returned by a `DocumentStore` implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The store could not be reached or is temporarily refusing work
    /// (connection refused, busy, timed out).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The handle was closed and can no longer be used.
    #[error("store connection is closed")]
    Closed,

    /// A document with this business key already exists.
    #[error("work order {number} already exists")]
    DuplicateNumber { number: i64 },

    /// A stored document could not be decoded or encoded.
    #[error("invalid document {id}: {message}")]
    InvalidDocument { id: String, message: String },

    /// A backend-specific storage error (I/O, SQL, task failure, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::Unavailable(_) | StorageError::Closed | StorageError::Backend(_)
        )
    }
}
