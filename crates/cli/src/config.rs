//! Settings shared by every subcommand, read from flags or the environment.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, ValueEnum};
use workbridge_storage::RetryPolicy;
use workbridge_sync::{InboundPolicy, InboundPolicyKind};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "unsupported store URI '{0}' (expected mongodb://..., mongodb+srv://..., sqlite://<path> or memory://)"
    )]
    UnsupportedUri(String),

    #[error("store URI '{0}' has no database path")]
    MissingPath(String),

    #[error("collection name must not be empty")]
    EmptyCollection,

    #[error("invalid collection name '{0}' (letters, digits and '_' only, not starting with a digit)")]
    InvalidCollection(String),

    #[error("inbound policy 'archive' needs --processed-dir (DATA_PROCESSED_DIR)")]
    MissingProcessedDir,

    #[error("{0} must be at least 1")]
    ZeroAttempts(&'static str),

    #[error("could not create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where the system of record lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    /// Process-local; everything is discarded on exit.
    Memory,
    Sqlite(PathBuf),
    /// The full connection string; the database is taken from its path.
    Mongo(String),
}

impl StoreTarget {
    pub fn parse(uri: &str) -> Result<Self, ConfigError> {
        let uri = uri.trim();
        if uri == "memory://" || uri == "memory" {
            return Ok(StoreTarget::Memory);
        }
        if uri.starts_with("mongodb://") || uri.starts_with("mongodb+srv://") {
            return Ok(StoreTarget::Mongo(uri.to_string()));
        }
        match uri.strip_prefix("sqlite://") {
            Some("") => Err(ConfigError::MissingPath(uri.to_string())),
            Some(path) => Ok(StoreTarget::Sqlite(PathBuf::from(path))),
            None => Err(ConfigError::UnsupportedUri(uri.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RunMode {
    #[default]
    Once,
    Continuous,
}

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Document store URI: mongodb://host:port/<database>, sqlite://<path>,
    /// or memory:// for a dry run that keeps nothing after exit
    #[arg(long, env = "STORE_URI")]
    pub store_uri: String,

    /// Collection (table) holding the work orders
    #[arg(long, env = "STORE_COLLECTION", default_value = "work_orders")]
    pub collection: String,

    /// Directory the client drops inbound work orders into
    #[arg(long, env = "DATA_INBOUND_DIR")]
    pub inbound_dir: PathBuf,

    /// Directory synchronized work orders are written to
    #[arg(long, env = "DATA_OUTBOUND_DIR")]
    pub outbound_dir: PathBuf,

    /// What to do with an inbound file once it is saved (keep, archive, delete)
    #[arg(long, env = "INBOUND_POLICY", default_value = "keep")]
    pub inbound_policy: InboundPolicyKind,

    /// Destination for archived inbound files
    #[arg(long, env = "DATA_PROCESSED_DIR")]
    pub processed_dir: Option<PathBuf>,

    #[arg(long, env = "STORE_CONNECT_ATTEMPTS", default_value_t = 3)]
    pub connect_attempts: u32,

    #[arg(long, env = "STORE_CONNECT_DELAY_MS", default_value_t = 2000)]
    pub connect_delay_ms: u64,

    #[arg(long, env = "STORE_WRITE_ATTEMPTS", default_value_t = 3)]
    pub write_attempts: u32,

    #[arg(long, env = "STORE_WRITE_DELAY_MS", default_value_t = 1000)]
    pub write_delay_ms: u64,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub store: StoreTarget,
    pub collection: String,
    pub inbound_dir: PathBuf,
    pub outbound_dir: PathBuf,
    pub policy: InboundPolicy,
    pub connect_policy: RetryPolicy,
    pub write_policy: RetryPolicy,
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Settings {
    pub fn from_args(args: &ConfigArgs) -> Result<Self, ConfigError> {
        let store = StoreTarget::parse(&args.store_uri)?;

        let collection = args.collection.trim();
        if collection.is_empty() {
            return Err(ConfigError::EmptyCollection);
        }
        if !is_identifier(collection) {
            return Err(ConfigError::InvalidCollection(collection.to_string()));
        }

        let policy = match args.inbound_policy {
            InboundPolicyKind::Keep => InboundPolicy::Keep,
            InboundPolicyKind::Delete => InboundPolicy::Delete,
            InboundPolicyKind::Archive => InboundPolicy::Archive {
                processed_dir: args
                    .processed_dir
                    .clone()
                    .ok_or(ConfigError::MissingProcessedDir)?,
            },
        };

        if args.connect_attempts == 0 {
            return Err(ConfigError::ZeroAttempts("--connect-attempts"));
        }
        if args.write_attempts == 0 {
            return Err(ConfigError::ZeroAttempts("--write-attempts"));
        }

        Ok(Settings {
            store,
            collection: collection.to_string(),
            inbound_dir: args.inbound_dir.clone(),
            outbound_dir: args.outbound_dir.clone(),
            policy,
            connect_policy: RetryPolicy::new(
                args.connect_attempts,
                Duration::from_millis(args.connect_delay_ms),
            ),
            write_policy: RetryPolicy::new(
                args.write_attempts,
                Duration::from_millis(args.write_delay_ms),
            ),
        })
    }

    /// Every directory the service reads or writes.
    pub fn directories(&self) -> Vec<&Path> {
        let mut dirs = vec![self.inbound_dir.as_path(), self.outbound_dir.as_path()];
        if let InboundPolicy::Archive { processed_dir } = &self.policy {
            dirs.push(processed_dir.as_path());
        }
        dirs
    }

    /// Create missing directories.
    pub fn prepare_dirs(&self) -> Result<(), ConfigError> {
        for dir in self.directories() {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}
