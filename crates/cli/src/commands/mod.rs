pub(crate) mod check;
pub(crate) mod run;

use tracing::{error, warn};
use workbridge_storage::{MemoryStore, MongoConnector, SqliteConnector};

use crate::config::{ConfigArgs, ConfigError, Settings, StoreTarget};

pub(crate) const EXIT_OK: i32 = 0;
pub(crate) const EXIT_STORE: i32 = 1;
pub(crate) const EXIT_CONFIG: i32 = 2;

/// The configured connector, resolved from the store URI.
pub(crate) enum Connector {
    Memory(MemoryStore),
    Sqlite(SqliteConnector),
    Mongo(MongoConnector),
}

/// Validate configuration, create directories and resolve the connector.
/// Errors are reported here; the caller only needs the exit code.
pub(crate) fn load(args: &ConfigArgs) -> Result<(Settings, Connector), i32> {
    let prepared = Settings::from_args(args).and_then(|settings| {
        settings.prepare_dirs()?;
        Ok(settings)
    });
    let settings = match prepared {
        Ok(settings) => settings,
        Err(e) => return Err(config_failure(&e)),
    };

    let connector = match &settings.store {
        StoreTarget::Memory => {
            warn!("memory:// store selected; imported work orders are discarded on exit");
            Ok(Connector::Memory(MemoryStore::new()))
        }
        StoreTarget::Sqlite(path) => {
            SqliteConnector::new(path, &settings.collection).map(Connector::Sqlite)
        }
        StoreTarget::Mongo(uri) => {
            MongoConnector::new(uri, &settings.collection).map(Connector::Mongo)
        }
    };
    match connector {
        Ok(connector) => Ok((settings, connector)),
        Err(e) => {
            error!(error = %e, "invalid store configuration");
            eprintln!("error: {e}");
            Err(EXIT_CONFIG)
        }
    }
}

fn config_failure(e: &ConfigError) -> i32 {
    error!(error = %e, "invalid configuration");
    eprintln!("error: {e}");
    EXIT_CONFIG
}
