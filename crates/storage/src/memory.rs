//! Process-local document store.
//!
//! A [`MemoryStore`] plays the role of the database server: it owns the
//! documents and hands out [`MemoryConnection`] handles that share them, so a
//! test can inspect the data between sync cycles while each cycle opens and
//! closes its own connection. It also counts writes and can be told to fail
//! the next N connects, reads, writes or sync marks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use time::OffsetDateTime;
use workbridge_core::InternalWorkOrder;

use crate::error::StorageError;
use crate::record::{DocumentId, StoredWorkOrder};
use crate::traits::{DocumentStore, StoreConnector};

/// Write counters for a [`MemoryStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub connects: u64,
    pub inserts: u64,
    pub updates: u64,
    pub synced: u64,
}

#[derive(Debug, Default)]
struct Faults {
    connect: u32,
    read: u32,
    write: u32,
    mark: u32,
}

fn take_fault(counter: &mut u32) -> bool {
    if *counter > 0 {
        *counter -= 1;
        true
    } else {
        false
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    docs: Vec<StoredWorkOrder>,
    stats: WriteStats,
    faults: Faults,
}

/// In-memory document store, shared by every connection it opens.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a document directly, bypassing counters and faults.
    pub fn seed(&self, order: InternalWorkOrder) -> DocumentId {
        let id = DocumentId::generate();
        self.lock().docs.push(StoredWorkOrder {
            id: id.clone(),
            order,
        });
        id
    }

    pub fn get(&self, number: i64) -> Option<StoredWorkOrder> {
        self.lock()
            .docs
            .iter()
            .find(|d| d.order.number == number)
            .cloned()
    }

    pub fn documents(&self) -> Vec<StoredWorkOrder> {
        self.lock().docs.clone()
    }

    pub fn stats(&self) -> WriteStats {
        self.lock().stats
    }

    pub fn fail_next_connects(&self, n: u32) {
        self.lock().faults.connect = n;
    }

    pub fn fail_next_reads(&self, n: u32) {
        self.lock().faults.read = n;
    }

    pub fn fail_next_writes(&self, n: u32) {
        self.lock().faults.write = n;
    }

    pub fn fail_next_marks(&self, n: u32) {
        self.lock().faults.mark = n;
    }
}

#[async_trait]
impl StoreConnector for MemoryStore {
    type Store = MemoryConnection;

    fn describe(&self) -> String {
        "memory://".to_string()
    }

    async fn open(&self) -> Result<MemoryConnection, StorageError> {
        let mut state = self.lock();
        if take_fault(&mut state.faults.connect) {
            return Err(StorageError::Unavailable(
                "injected connection failure".to_string(),
            ));
        }
        state.stats.connects += 1;
        Ok(MemoryConnection {
            store: self.clone(),
            open: AtomicBool::new(true),
        })
    }
}

/// A handle opened by [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryConnection {
    store: MemoryStore,
    open: AtomicBool,
}

impl MemoryConnection {
    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(StorageError::Closed);
        }
        Ok(self.store.lock())
    }
}

#[async_trait]
impl DocumentStore for MemoryConnection {
    async fn ping(&self) -> Result<(), StorageError> {
        self.state().map(|_| ())
    }

    async fn find_by_number(&self, number: i64) -> Result<Option<StoredWorkOrder>, StorageError> {
        let mut state = self.state()?;
        if take_fault(&mut state.faults.read) {
            return Err(StorageError::Unavailable("injected read failure".to_string()));
        }
        Ok(state
            .docs
            .iter()
            .find(|d| d.order.number == number)
            .cloned())
    }

    async fn find_unsynced(&self, limit: usize) -> Result<Vec<StoredWorkOrder>, StorageError> {
        let mut state = self.state()?;
        if take_fault(&mut state.faults.read) {
            return Err(StorageError::Unavailable("injected read failure".to_string()));
        }
        let limit = if limit == 0 { usize::MAX } else { limit };
        Ok(state
            .docs
            .iter()
            .filter(|d| !d.order.is_synced)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert(&self, order: &InternalWorkOrder) -> Result<DocumentId, StorageError> {
        let mut state = self.state()?;
        if take_fault(&mut state.faults.write) {
            return Err(StorageError::Unavailable("injected write failure".to_string()));
        }
        if state.docs.iter().any(|d| d.order.number == order.number) {
            return Err(StorageError::DuplicateNumber {
                number: order.number,
            });
        }
        let id = DocumentId::generate();
        state.docs.push(StoredWorkOrder {
            id: id.clone(),
            order: order.clone(),
        });
        state.stats.inserts += 1;
        Ok(id)
    }

    async fn replace(&self, order: &InternalWorkOrder) -> Result<u64, StorageError> {
        let mut state = self.state()?;
        if take_fault(&mut state.faults.write) {
            return Err(StorageError::Unavailable("injected write failure".to_string()));
        }
        let Some(doc) = state
            .docs
            .iter_mut()
            .find(|d| d.order.number == order.number)
        else {
            return Ok(0);
        };
        doc.order = order.clone();
        state.stats.updates += 1;
        Ok(1)
    }

    async fn set_synced(&self, id: &DocumentId, at: OffsetDateTime) -> Result<u64, StorageError> {
        let mut state = self.state()?;
        if take_fault(&mut state.faults.mark) {
            return Err(StorageError::Unavailable("injected sync mark failure".to_string()));
        }
        let Some(doc) = state.docs.iter_mut().find(|d| &d.id == id) else {
            return Ok(0);
        };
        doc.order.is_synced = true;
        doc.order.synced_at = Some(at);
        state.stats.synced += 1;
        Ok(1)
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}
