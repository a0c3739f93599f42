use workbridge_storage::{StoreClient, StoreConnector};

use super::{load, Connector, EXIT_OK, EXIT_STORE};
use crate::config::{ConfigArgs, Settings};

/// Validate configuration, create directories and probe the store.
pub(crate) async fn cmd_check(args: ConfigArgs) -> i32 {
    let (settings, connector) = match load(&args) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    match connector {
        Connector::Memory(c) => probe(c, &settings).await,
        Connector::Sqlite(c) => probe(c, &settings).await,
        Connector::Mongo(c) => probe(c, &settings).await,
    }
}

async fn probe<C: StoreConnector>(connector: C, settings: &Settings) -> i32 {
    println!("store:      {}", connector.describe());
    println!("collection: {}", settings.collection);
    println!("inbound:    {}", settings.inbound_dir.display());
    println!("outbound:   {}", settings.outbound_dir.display());
    println!("policy:     {}", settings.policy);

    let client = StoreClient::new(connector).with_connect_policy(settings.connect_policy);
    let code = match client.connect().await {
        Ok(session) => {
            let pending = session.fetch_unsynchronized().await.len();
            session.close().await;
            println!("connection: ok ({pending} unsynchronized work orders pending)");
            EXIT_OK
        }
        Err(e) => {
            println!("connection: failed");
            eprintln!("error: {e}");
            EXIT_STORE
        }
    };
    code
}
