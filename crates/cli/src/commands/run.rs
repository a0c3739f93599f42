use std::time::Duration;

use clap::Args;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use workbridge_storage::{StoreClient, StoreConnector};
use workbridge_sync::{FsExternalStore, Orchestrator};

use super::{load, Connector, EXIT_OK, EXIT_STORE};
use crate::config::{ConfigArgs, RunMode, Settings};

#[derive(Debug, Clone, Args)]
pub(crate) struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Run a single cycle, or keep syncing until interrupted
    #[arg(long, env = "RUN_MODE", value_enum, default_value_t = RunMode::Once)]
    pub mode: RunMode,

    /// Seconds to wait between cycles in continuous mode
    #[arg(long, env = "SYNC_INTERVAL_SECONDS", default_value_t = 60)]
    pub interval: u64,
}

pub(crate) async fn cmd_run(args: RunArgs) -> i32 {
    let (settings, connector) = match load(&args.config) {
        Ok(loaded) => loaded,
        Err(code) => return code,
    };
    let interval = Duration::from_secs(args.interval);

    match connector {
        Connector::Memory(c) => run_with(c, &settings, args.mode, interval).await,
        Connector::Sqlite(c) => run_with(c, &settings, args.mode, interval).await,
        Connector::Mongo(c) => run_with(c, &settings, args.mode, interval).await,
    }
}

async fn run_with<C: StoreConnector>(
    connector: C,
    settings: &Settings,
    mode: RunMode,
    interval: Duration,
) -> i32 {
    info!(
        store = %connector.describe(),
        inbound = %settings.inbound_dir.display(),
        outbound = %settings.outbound_dir.display(),
        policy = %settings.policy,
        "starting workbridge"
    );

    let client = StoreClient::new(connector)
        .with_connect_policy(settings.connect_policy)
        .with_write_policy(settings.write_policy);
    let external = FsExternalStore::new(&settings.inbound_dir, &settings.outbound_dir)
        .with_policy(settings.policy.clone());
    let orchestrator = Orchestrator::new(client, external);

    // A store that is unreachable at startup is fatal in every mode.
    match orchestrator.client().connect().await {
        Ok(session) => session.close().await,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_STORE;
        }
    }

    match mode {
        RunMode::Once => match orchestrator.run_cycle().await {
            Ok(report) => {
                info!(%report, "sync finished");
                EXIT_OK
            }
            Err(e) => {
                error!(error = %e, "sync cycle failed");
                eprintln!("error: {e}");
                EXIT_STORE
            }
        },
        RunMode::Continuous => {
            let cancel = CancellationToken::new();
            tokio::spawn(shutdown_signal(cancel.clone()));
            orchestrator.run_continuously(interval, cancel).await;
            EXIT_OK
        }
    }
}

/// Cancel `token` on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down after the current cycle"),
        () = terminate => info!("received SIGTERM, shutting down after the current cycle"),
    }
    token.cancel();
}
