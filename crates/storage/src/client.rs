//! The retrying client the sync engine uses to talk to the system of record.
//!
//! Connection lifecycle: `Disconnected → Connecting → Connected`. A
//! successful [`StoreClient::connect`] yields a [`Session`] that owns the
//! store handle; closing or dropping the session returns the client to
//! `Disconnected`.

use std::sync::{Mutex, PoisonError};

use time::OffsetDateTime;
use tracing::{debug, error, info};
use workbridge_core::InternalWorkOrder;

use crate::error::StorageError;
use crate::record::{DocumentId, StoredWorkOrder};
use crate::retry::{RetryError, RetryPolicy};
use crate::traits::{DocumentStore, StoreConnector};

/// Maximum number of unsynchronized work orders fetched per call.
pub const UNSYNCED_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("could not connect to {target} after {attempts} attempt(s): {source}")]
    Connect {
        target: String,
        attempts: u32,
        #[source]
        source: StorageError,
    },

    #[error("could not save work order {number} after {attempts} attempt(s): {source}")]
    Upsert {
        number: i64,
        attempts: u32,
        #[source]
        source: StorageError,
    },
}

/// What [`Session::upsert`] did with an inbound work order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(DocumentId),
    Updated,
    /// A document with identical sync-relevant fields already existed;
    /// nothing was written.
    Unchanged,
}

/// Connects to one document store with bounded retries.
pub struct StoreClient<C> {
    connector: C,
    connect_policy: RetryPolicy,
    write_policy: RetryPolicy,
    state: Mutex<ConnectionState>,
}

impl<C: StoreConnector> StoreClient<C> {
    pub fn new(connector: C) -> Self {
        StoreClient {
            connector,
            connect_policy: RetryPolicy::CONNECT,
            write_policy: RetryPolicy::WRITE,
            state: Mutex::new(ConnectionState::Disconnected),
        }
    }

    pub fn with_connect_policy(mut self, policy: RetryPolicy) -> Self {
        self.connect_policy = policy;
        self
    }

    pub fn with_write_policy(mut self, policy: RetryPolicy) -> Self {
        self.write_policy = policy;
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Open and ping a store handle, retrying per the connect policy.
    ///
    /// Exhausting the policy returns `ClientError::Connect`; callers decide
    /// whether that is fatal.
    pub async fn connect(&self) -> Result<Session<'_, C>, ClientError> {
        let target = self.connector.describe();
        self.set_state(ConnectionState::Connecting);
        info!(target = %target, "connecting to document store");

        let opened = self
            .connect_policy
            .run("connect", |attempt| async move {
                debug!(attempt, "opening store handle");
                let store = self.connector.open().await?;
                store.ping().await?;
                Ok(store)
            })
            .await;

        match opened {
            Ok(store) => {
                self.set_state(ConnectionState::Connected);
                info!(target = %target, "connected to document store");
                Ok(Session {
                    client: self,
                    store,
                })
            }
            Err(RetryError { attempts, source }) => {
                self.set_state(ConnectionState::Disconnected);
                error!(target = %target, attempts, error = %source, "giving up on document store connection");
                Err(ClientError::Connect {
                    target,
                    attempts,
                    source,
                })
            }
        }
    }
}

/// An open connection, owned by exactly one sync cycle.
pub struct Session<'c, C: StoreConnector> {
    client: &'c StoreClient<C>,
    store: C::Store,
}

impl<'c, C: StoreConnector> Session<'c, C> {
    pub fn store(&self) -> &C::Store {
        &self.store
    }

    /// Up to [`UNSYNCED_PAGE_SIZE`] work orders with `isSynced == false`.
    ///
    /// A failing query is logged and reported as "nothing to do".
    pub async fn fetch_unsynchronized(&self) -> Vec<StoredWorkOrder> {
        match self.store.find_unsynced(UNSYNCED_PAGE_SIZE).await {
            Ok(docs) => docs,
            Err(e) => {
                error!(error = %e, "could not fetch unsynchronized work orders");
                Vec::new()
            }
        }
    }

    /// Create or update the document keyed by `order.number`.
    ///
    /// An existing document whose sync-relevant fields match is left
    /// untouched. Otherwise the document is written unsynced with
    /// `updatedAt` (and, for new documents, `createdAt`) set to now.
    /// Transient failures are retried per the write policy.
    pub async fn upsert(&self, order: &InternalWorkOrder) -> Result<UpsertOutcome, ClientError> {
        self.client
            .write_policy
            .run("upsert", |_| self.try_upsert(order))
            .await
            .map_err(|RetryError { attempts, source }| ClientError::Upsert {
                number: order.number,
                attempts,
                source,
            })
    }

    async fn try_upsert(&self, incoming: &InternalWorkOrder) -> Result<UpsertOutcome, StorageError> {
        let now = OffsetDateTime::now_utc();
        match self.store.find_by_number(incoming.number).await? {
            Some(existing) if existing.order.same_sync_fields(incoming) => {
                info!(order_no = incoming.number, "work order already up to date, skipping");
                Ok(UpsertOutcome::Unchanged)
            }
            Some(existing) => {
                let mut updated = existing.order;
                updated.status = incoming.status;
                updated.title = incoming.title.clone();
                updated.description = incoming.description.clone();
                updated.deleted = incoming.deleted;
                updated.deleted_at = incoming.deleted_at;
                updated.updated_at = now;
                updated.is_synced = false;

                if self.store.replace(&updated).await? == 0 {
                    // Vanished between the lookup and the write.
                    return Err(StorageError::Backend(format!(
                        "work order {} disappeared during update",
                        incoming.number
                    )));
                }
                info!(order_no = incoming.number, status = %updated.status, "updated work order");
                Ok(UpsertOutcome::Updated)
            }
            None => {
                let mut fresh = incoming.clone();
                fresh.created_at = now;
                fresh.updated_at = now;
                fresh.is_synced = false;
                fresh.synced_at = None;

                let id = self.store.insert(&fresh).await?;
                info!(order_no = incoming.number, id = %id, "created work order");
                Ok(UpsertOutcome::Inserted(id))
            }
        }
    }

    /// Flag a document as synchronized. Not retried: a document that stays
    /// unsynced is picked up again by the next outbound pass.
    pub async fn mark_synced(&self, id: &DocumentId) -> bool {
        match self.store.set_synced(id, OffsetDateTime::now_utc()).await {
            Ok(0) => {
                error!(id = %id, "could not mark work order as synced: not found");
                false
            }
            Ok(_) => true,
            Err(e) => {
                error!(id = %id, error = %e, "could not mark work order as synced");
                false
            }
        }
    }

    /// Close the handle. Dropping the session without calling this still
    /// releases the handle and resets the client state.
    pub async fn close(self) {
        if let Err(e) = self.store.close().await {
            error!(error = %e, "error while closing document store handle");
        }
        info!("disconnected from document store");
    }
}

impl<C: StoreConnector> Drop for Session<'_, C> {
    fn drop(&mut self) {
        self.client.set_state(ConnectionState::Disconnected);
    }
}
