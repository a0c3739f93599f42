//! MongoDB-backed document store.
//!
//! Work orders are stored one document per order in a single collection,
//! with a unique index on `number` and the server-assigned `ObjectId` as the
//! document identity. Timestamps are kept in the same string form the other
//! backends use.
//!
//! The database name comes from the path of the connection URI
//! (`mongodb://host:27017/<database>?...`), falling back to
//! [`DEFAULT_DATABASE`] when the URI has none.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use time::OffsetDateTime;
use tracing::warn;
use workbridge_core::{timestamp, InternalWorkOrder};

use crate::error::StorageError;
use crate::record::{DocumentId, StoredWorkOrder};
use crate::traits::{DocumentStore, StoreConnector};

pub const DEFAULT_DATABASE: &str = "workbridge";

const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const DUPLICATE_KEY: i32 = 11000;

impl From<mongodb::error::Error> for StorageError {
    fn from(e: mongodb::error::Error) -> Self {
        match *e.kind {
            ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => {
                StorageError::Unavailable(e.to_string())
            }
            _ => StorageError::Backend(e.to_string()),
        }
    }
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        *e.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref failure)) if failure.code == DUPLICATE_KEY
    )
}

/// The database named by the path segment of a MongoDB URI.
pub fn database_from_uri(uri: &str) -> String {
    let rest = uri
        .trim()
        .split_once("://")
        .map_or(uri.trim(), |(_, rest)| rest);
    rest.split_once('/')
        .map(|(_, path)| path.split('?').next().unwrap_or_default())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_DATABASE)
        .to_string()
}

/// Opens [`MongoStore`] handles on one database and collection.
#[derive(Debug, Clone)]
pub struct MongoConnector {
    uri: String,
    database: String,
    collection: String,
}

impl MongoConnector {
    pub fn new(uri: &str, collection: &str) -> Result<Self, StorageError> {
        if collection.is_empty() || collection.contains('$') || collection.contains('\0') {
            return Err(StorageError::Backend(format!(
                "invalid collection name '{collection}'"
            )));
        }
        Ok(MongoConnector {
            uri: uri.trim().to_string(),
            database: database_from_uri(uri),
            collection: collection.to_string(),
        })
    }

    /// Use `database` instead of the one named in the URI.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The URI with any password replaced, for logs.
    fn redacted_uri(&self) -> String {
        match self.uri.split_once("://") {
            Some((scheme, rest)) => match rest.split_once('@') {
                Some((credentials, host)) => {
                    let user = credentials.split(':').next().unwrap_or_default();
                    format!("{scheme}://{user}:***@{host}")
                }
                None => self.uri.clone(),
            },
            None => self.uri.clone(),
        }
    }
}

#[async_trait]
impl StoreConnector for MongoConnector {
    type Store = MongoStore;

    fn describe(&self) -> String {
        format!(
            "{} ({}.{})",
            self.redacted_uri(),
            self.database,
            self.collection
        )
    }

    async fn open(&self) -> Result<MongoStore, StorageError> {
        let mut options = ClientOptions::parse(self.uri.as_str()).await?;
        if options.server_selection_timeout.is_none() {
            options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
        }
        if options.connect_timeout.is_none() {
            options.connect_timeout = Some(CONNECT_TIMEOUT);
        }
        let client = Client::with_options(options)?;

        let db = client.database(&self.database);
        db.run_command(doc! { "ping": 1 }).await?;

        let collection = db.collection::<Document>(&self.collection);
        let index = IndexModel::builder()
            .keys(doc! { "number": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        collection.create_index(index).await?;

        Ok(MongoStore {
            handle: Mutex::new(Some(Handle { client, collection })),
        })
    }
}

#[derive(Debug, Clone)]
struct Handle {
    client: Client,
    collection: Collection<Document>,
}

/// An open handle on one MongoDB collection.
#[derive(Debug)]
pub struct MongoStore {
    handle: Mutex<Option<Handle>>,
}

impl MongoStore {
    fn collection(&self) -> Result<Collection<Document>, StorageError> {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|h| h.collection.clone())
            .ok_or(StorageError::Closed)
    }
}

fn encode(order: &InternalWorkOrder) -> Result<Document, StorageError> {
    bson::to_document(order).map_err(|e| StorageError::InvalidDocument {
        id: format!("number {}", order.number),
        message: e.to_string(),
    })
}

fn decode(mut raw: Document) -> Result<StoredWorkOrder, StorageError> {
    let id = match raw.remove("_id") {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(Bson::String(s)) => s,
        Some(other) => other.to_string(),
        None => String::from("<missing _id>"),
    };
    match bson::from_document(raw) {
        Ok(order) => Ok(StoredWorkOrder {
            id: DocumentId::from(id),
            order,
        }),
        Err(e) => Err(StorageError::InvalidDocument {
            id,
            message: e.to_string(),
        }),
    }
}

/// Filter on the document identity. Identities that are not ObjectIds were
/// written by someone else and are matched as plain strings.
fn id_filter(id: &DocumentId) -> Document {
    match ObjectId::parse_str(id.as_str()) {
        Ok(oid) => doc! { "_id": oid },
        Err(_) => doc! { "_id": id.as_str() },
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ping(&self) -> Result<(), StorageError> {
        let db = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|h| h.client.database("admin"))
            .ok_or(StorageError::Closed)?;
        db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn find_by_number(&self, number: i64) -> Result<Option<StoredWorkOrder>, StorageError> {
        let found = self
            .collection()?
            .find_one(doc! { "number": number })
            .await?;
        found.map(decode).transpose()
    }

    async fn find_unsynced(&self, limit: usize) -> Result<Vec<StoredWorkOrder>, StorageError> {
        // Same rule as the SQLite backend: the cap counts decodable documents
        // only, so the cursor is not limited server-side.
        let mut cursor = self
            .collection()?
            .find(doc! { "isSynced": { "$ne": true } })
            .sort(doc! { "_id": 1 })
            .await?;

        let mut docs = Vec::new();
        while (limit == 0 || docs.len() < limit) && cursor.advance().await? {
            match cursor.deserialize_current().map_err(StorageError::from).and_then(decode) {
                Ok(doc) => docs.push(doc),
                Err(e) => warn!(error = %e, "skipping undecodable work order document"),
            }
        }
        Ok(docs)
    }

    async fn insert(&self, order: &InternalWorkOrder) -> Result<DocumentId, StorageError> {
        let body = encode(order)?;
        let result = match self.collection()?.insert_one(body).await {
            Ok(result) => result,
            Err(e) if is_duplicate_key(&e) => {
                return Err(StorageError::DuplicateNumber {
                    number: order.number,
                })
            }
            Err(e) => return Err(e.into()),
        };
        let id = match result.inserted_id {
            Bson::ObjectId(oid) => oid.to_hex(),
            Bson::String(s) => s,
            other => other.to_string(),
        };
        Ok(DocumentId::from(id))
    }

    async fn replace(&self, order: &InternalWorkOrder) -> Result<u64, StorageError> {
        let body = encode(order)?;
        let result = self
            .collection()?
            .replace_one(doc! { "number": order.number }, body)
            .await?;
        Ok(result.matched_count)
    }

    async fn set_synced(&self, id: &DocumentId, at: OffsetDateTime) -> Result<u64, StorageError> {
        let update = doc! {
            "$set": { "isSynced": true, "syncedAt": timestamp::format(at) }
        };
        let result = self
            .collection()?
            .update_one(id_filter(id), update)
            .await?;
        Ok(result.matched_count)
    }

    async fn close(&self) -> Result<(), StorageError> {
        let taken = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = taken {
            handle.client.shutdown().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_name_comes_from_uri_path() {
        assert_eq!(database_from_uri("mongodb://localhost:27017/tracos"), "tracos");
        assert_eq!(
            database_from_uri("mongodb://u:p@db1,db2/orders?replicaSet=rs0"),
            "orders"
        );
        assert_eq!(
            database_from_uri("mongodb+srv://cluster.example.net/ops?retryWrites=true"),
            "ops"
        );
        assert_eq!(database_from_uri("mongodb://localhost:27017"), DEFAULT_DATABASE);
        assert_eq!(database_from_uri("mongodb://localhost:27017/"), DEFAULT_DATABASE);
        assert_eq!(
            database_from_uri("mongodb://localhost/?authSource=admin"),
            DEFAULT_DATABASE
        );
    }

    #[test]
    fn collection_names_are_checked() {
        assert!(MongoConnector::new("mongodb://localhost", "work_orders").is_ok());
        assert!(MongoConnector::new("mongodb://localhost", "").is_err());
        assert!(MongoConnector::new("mongodb://localhost", "orders$x").is_err());
    }

    #[test]
    fn describe_hides_password() {
        let connector =
            MongoConnector::new("mongodb://sync:s3cret@db:27017/tracos", "work_orders").unwrap();
        let described = connector.describe();
        assert!(!described.contains("s3cret"), "{described}");
        assert!(described.contains("sync:***@db:27017"), "{described}");
        assert!(described.ends_with("(tracos.work_orders)"), "{described}");
    }

    #[test]
    fn decode_takes_identity_from_object_id() {
        let oid = ObjectId::new();
        let mut raw = encode(&InternalWorkOrder::new(4)).unwrap();
        raw.insert("_id", oid);
        let stored = decode(raw).unwrap();
        assert_eq!(stored.id.as_str(), oid.to_hex());
        assert_eq!(stored.order.number, 4);
        assert_eq!(id_filter(&stored.id), doc! { "_id": oid });
    }

    #[test]
    fn decode_rejects_unknown_status() {
        let raw = doc! { "_id": ObjectId::new(), "number": 5_i64, "status": "created" };
        assert!(matches!(decode(raw), Err(StorageError::InvalidDocument { .. })));
    }

    #[tokio::test]
    async fn unreachable_server_is_transient() {
        let connector = MongoConnector::new(
            "mongodb://127.0.0.1:1/workbridge?serverSelectionTimeoutMS=200&connectTimeoutMS=200",
            "work_orders",
        )
        .unwrap();
        let err = connector.open().await.unwrap_err();
        assert!(err.is_transient(), "{err:?}");
    }
}
