mod client;
pub mod conformance;
mod error;
mod memory;
mod mongo;
mod record;
mod retry;
mod sqlite;
mod traits;

pub use client::{
    ClientError, ConnectionState, Session, StoreClient, UpsertOutcome, UNSYNCED_PAGE_SIZE,
};
pub use error::StorageError;
pub use memory::{MemoryConnection, MemoryStore, WriteStats};
pub use mongo::{database_from_uri, MongoConnector, MongoStore, DEFAULT_DATABASE};
pub use record::{DocumentId, StoredWorkOrder};
pub use retry::{RetryError, RetryPolicy};
pub use sqlite::{SqliteConnector, SqliteStore};
pub use traits::{DocumentStore, StoreConnector};
