//! The client-side exchange: an inbox of work-order files to import and an
//! outbox the engine writes synchronized work orders to.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};
use workbridge_core::{validate_inbound, ExternalWorkOrder};

#[derive(Debug, thiserror::Error)]
pub enum ExternalStoreError {
    #[error("could not list inbound directory {}: {source}", .path.display())]
    ListInbound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not encode work order {order_no}: {source}")]
    Encode {
        order_no: i64,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not dispose of inbound file {}: {source}", .path.display())]
    Dispose {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What happens to an inbound file once its work order has been saved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InboundPolicy {
    /// Leave the file in place; the next cycle re-reads it and the upsert
    /// is a no-op.
    #[default]
    Keep,
    /// Move the file into `processed_dir`.
    Archive { processed_dir: PathBuf },
    Delete,
}

impl fmt::Display for InboundPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InboundPolicy::Keep => f.write_str("keep"),
            InboundPolicy::Archive { processed_dir } => {
                write!(f, "archive to {}", processed_dir.display())
            }
            InboundPolicy::Delete => f.write_str("delete"),
        }
    }
}

/// The policy names accepted on the command line, before an archive
/// directory is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InboundPolicyKind {
    #[default]
    Keep,
    Archive,
    Delete,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown inbound policy '{0}' (expected keep, archive or delete)")]
pub struct UnknownPolicy(String);

impl FromStr for InboundPolicyKind {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(InboundPolicyKind::Keep),
            "archive" => Ok(InboundPolicyKind::Archive),
            "delete" => Ok(InboundPolicyKind::Delete),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

/// One accepted inbound work order and the file it came from.
#[derive(Debug, Clone)]
pub struct InboundEntry {
    pub path: PathBuf,
    pub order: ExternalWorkOrder,
}

/// Result of listing the inbox.
#[derive(Debug, Default)]
pub struct InboundBatch {
    pub entries: Vec<InboundEntry>,
    /// Files that could not be read, parsed or validated. They stay in the
    /// inbox untouched.
    pub rejected: usize,
}

/// The external side of the sync.
///
/// Implementations must be `Send + Sync` so an orchestrator can be driven
/// from a spawned task.
#[async_trait]
pub trait ExternalStore: Send + Sync {
    /// Read and validate every pending inbound work order.
    ///
    /// Per-file problems are logged and counted in
    /// [`InboundBatch::rejected`]; only an unreadable inbox is an error.
    async fn list_inbound(&self) -> Result<InboundBatch, ExternalStoreError>;

    /// Persist one outbound work order, replacing any earlier file for the
    /// same order number. Returns the path written.
    async fn write_outbound(&self, order: &ExternalWorkOrder) -> Result<PathBuf, ExternalStoreError>;

    /// Apply the inbound policy to an entry whose work order was saved.
    async fn acknowledge(&self, entry: &InboundEntry) -> Result<(), ExternalStoreError>;
}

/// [`ExternalStore`] over two local directories.
#[derive(Debug, Clone)]
pub struct FsExternalStore {
    inbound_dir: PathBuf,
    outbound_dir: PathBuf,
    policy: InboundPolicy,
}

impl FsExternalStore {
    pub fn new(inbound_dir: impl Into<PathBuf>, outbound_dir: impl Into<PathBuf>) -> Self {
        FsExternalStore {
            inbound_dir: inbound_dir.into(),
            outbound_dir: outbound_dir.into(),
            policy: InboundPolicy::Keep,
        }
    }

    pub fn with_policy(mut self, policy: InboundPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn inbound_dir(&self) -> &Path {
        &self.inbound_dir
    }

    pub fn outbound_dir(&self) -> &Path {
        &self.outbound_dir
    }

    pub fn policy(&self) -> &InboundPolicy {
        &self.policy
    }

    /// The file `order_no` is written to.
    pub fn outbound_path(&self, order_no: i64) -> PathBuf {
        self.outbound_dir.join(format!("{order_no}.json"))
    }

    async fn inbound_files(&self) -> Result<Vec<PathBuf>, ExternalStoreError> {
        let list_err = |source| ExternalStoreError::ListInbound {
            path: self.inbound_dir.clone(),
            source,
        };
        let mut dir = tokio::fs::read_dir(&self.inbound_dir)
            .await
            .map_err(list_err)?;

        let mut files = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(list_err)? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && entry.file_type().await.map(|t| t.is_file()).unwrap_or(false)
            {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    async fn read_entry(path: &Path) -> Option<ExternalWorkOrder> {
        let name = file_name(path);
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(file = %name, error = %e, "could not read inbound file");
                return None;
            }
        };
        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                error!(file = %name, error = %e, "inbound file is not valid JSON");
                return None;
            }
        };
        match validate_inbound(value) {
            Ok(order) => Some(order),
            Err(e) => {
                warn!(file = %name, error = %e, "skipping invalid inbound work order");
                None
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[async_trait]
impl ExternalStore for FsExternalStore {
    async fn list_inbound(&self) -> Result<InboundBatch, ExternalStoreError> {
        let mut batch = InboundBatch::default();
        for path in self.inbound_files().await? {
            match Self::read_entry(&path).await {
                Some(order) => batch.entries.push(InboundEntry { path, order }),
                None => batch.rejected += 1,
            }
        }
        debug!(
            accepted = batch.entries.len(),
            rejected = batch.rejected,
            "listed inbound directory"
        );
        Ok(batch)
    }

    async fn write_outbound(&self, order: &ExternalWorkOrder) -> Result<PathBuf, ExternalStoreError> {
        let path = self.outbound_path(order.order_no);
        let tmp = self.outbound_dir.join(format!("{}.json.tmp", order.order_no));

        let body = serde_json::to_vec_pretty(order).map_err(|source| ExternalStoreError::Encode {
            order_no: order.order_no,
            source,
        })?;

        let write_err = |source| ExternalStoreError::Write {
            path: path.clone(),
            source,
        };
        let written: io::Result<()> = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(&body).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &path).await
        }
        .await;
        if let Err(e) = written {
            // Nothing partial is left behind, whichever step failed.
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }

        info!(order_no = order.order_no, path = %path.display(), "wrote outbound work order");
        Ok(path)
    }

    async fn acknowledge(&self, entry: &InboundEntry) -> Result<(), ExternalStoreError> {
        let dispose_err = |source| ExternalStoreError::Dispose {
            path: entry.path.clone(),
            source,
        };
        match &self.policy {
            InboundPolicy::Keep => Ok(()),
            InboundPolicy::Archive { processed_dir } => {
                tokio::fs::create_dir_all(processed_dir)
                    .await
                    .map_err(dispose_err)?;
                let target = processed_dir.join(file_name(&entry.path));
                tokio::fs::rename(&entry.path, &target)
                    .await
                    .map_err(dispose_err)?;
                debug!(order_no = entry.order.order_no, path = %target.display(), "archived inbound file");
                Ok(())
            }
            InboundPolicy::Delete => {
                tokio::fs::remove_file(&entry.path)
                    .await
                    .map_err(dispose_err)?;
                debug!(order_no = entry.order.order_no, "deleted inbound file");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    const VALID: &str = r#"{"orderNo": 1, "isCanceled": false, "isDeleted": false, "creationDate": "2025-05-01T00:00:00Z"}"#;

    #[tokio::test]
    async fn list_inbound_skips_invalid_files_and_counts_them() {
        let inbox = tempfile::tempdir().unwrap();
        let outbox = tempfile::tempdir().unwrap();
        write(inbox.path(), "b.json", VALID);
        write(inbox.path(), "a.json", r#"{"orderNo": 2, "isCanceled": false}"#);
        write(inbox.path(), "c.json", "not json");
        write(inbox.path(), "d.json", r#"{"orderNo": "3", "isCanceled": false, "isDeleted": false, "creationDate": "x"}"#);
        write(inbox.path(), "notes.txt", VALID);

        let store = FsExternalStore::new(inbox.path(), outbox.path());
        let batch = store.list_inbound().await.unwrap();

        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].order.order_no, 1);
        assert_eq!(batch.rejected, 3);
    }

    #[tokio::test]
    async fn list_inbound_is_sorted_by_file_name() {
        let inbox = tempfile::tempdir().unwrap();
        let outbox = tempfile::tempdir().unwrap();
        for n in [3, 1, 2] {
            write(
                inbox.path(),
                &format!("{n}.json"),
                &VALID.replace("\"orderNo\": 1", &format!("\"orderNo\": {n}")),
            );
        }
        let store = FsExternalStore::new(inbox.path(), outbox.path());
        let numbers: Vec<i64> = store
            .list_inbound()
            .await
            .unwrap()
            .entries
            .iter()
            .map(|e| e.order.order_no)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn list_inbound_missing_directory_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let store = FsExternalStore::new(root.path().join("nope"), root.path());
        assert!(matches!(
            store.list_inbound().await,
            Err(ExternalStoreError::ListInbound { .. })
        ));
    }

    #[tokio::test]
    async fn write_outbound_overwrites_and_leaves_no_temp_file() {
        let inbox = tempfile::tempdir().unwrap();
        let outbox = tempfile::tempdir().unwrap();
        let store = FsExternalStore::new(inbox.path(), outbox.path());

        let mut order = ExternalWorkOrder {
            order_no: 7,
            summary: Some("first".into()),
            ..Default::default()
        };
        store.write_outbound(&order).await.unwrap();
        order.summary = Some("second".into());
        let path = store.write_outbound(&order).await.unwrap();

        assert_eq!(path, outbox.path().join("7.json"));
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["summary"], "second");

        let names: Vec<String> = std::fs::read_dir(outbox.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["7.json".to_string()]);
    }

    #[tokio::test]
    async fn failed_write_removes_temp_file() {
        let inbox = tempfile::tempdir().unwrap();
        let outbox = tempfile::tempdir().unwrap();
        // A directory squatting on the target makes the final rename fail
        // after the temp file has been written.
        std::fs::create_dir(outbox.path().join("8.json")).unwrap();
        let store = FsExternalStore::new(inbox.path(), outbox.path());
        let order = ExternalWorkOrder {
            order_no: 8,
            ..Default::default()
        };

        assert!(matches!(
            store.write_outbound(&order).await,
            Err(ExternalStoreError::Write { .. })
        ));
        assert!(!outbox.path().join("8.json.tmp").exists());
    }

    #[tokio::test]
    async fn write_outbound_replaces_stale_temp_file() {
        let inbox = tempfile::tempdir().unwrap();
        let outbox = tempfile::tempdir().unwrap();
        write(outbox.path(), "9.json.tmp", "{\"orderNo\": 9");
        let store = FsExternalStore::new(inbox.path(), outbox.path());
        let order = ExternalWorkOrder {
            order_no: 9,
            ..Default::default()
        };

        store.write_outbound(&order).await.unwrap();
        assert!(!outbox.path().join("9.json.tmp").exists());
        assert!(outbox.path().join("9.json").is_file());
    }

    #[tokio::test]
    async fn write_outbound_to_missing_directory_fails() {
        let root = tempfile::tempdir().unwrap();
        let store = FsExternalStore::new(root.path(), root.path().join("gone"));
        let order = ExternalWorkOrder {
            order_no: 1,
            ..Default::default()
        };
        assert!(matches!(
            store.write_outbound(&order).await,
            Err(ExternalStoreError::Write { .. })
        ));
    }

    #[test]
    fn policy_kind_parses_case_insensitively() {
        assert_eq!("Keep".parse::<InboundPolicyKind>().unwrap(), InboundPolicyKind::Keep);
        assert_eq!("ARCHIVE".parse::<InboundPolicyKind>().unwrap(), InboundPolicyKind::Archive);
        assert_eq!("delete".parse::<InboundPolicyKind>().unwrap(), InboundPolicyKind::Delete);
        assert!("move".parse::<InboundPolicyKind>().is_err());
    }
}
