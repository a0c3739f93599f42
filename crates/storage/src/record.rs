use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use workbridge_core::InternalWorkOrder;

/// Opaque identity a store assigns to a document at insert time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn generate() -> Self {
        DocumentId(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DocumentId {
    fn from(raw: String) -> Self {
        DocumentId(raw)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A work order document together with its store identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredWorkOrder {
    pub id: DocumentId,
    pub order: InternalWorkOrder,
}
