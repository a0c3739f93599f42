mod commands;
mod config;
mod logging;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use crate::commands::check::cmd_check;
use crate::commands::run::{cmd_run, RunArgs};
use crate::config::ConfigArgs;

/// Bidirectional work-order sync between a client file exchange and a
/// document store.
#[derive(Parser)]
#[command(
    name = "workbridge",
    version,
    about = "Work-order sync between a file exchange and a document store"
)]
struct Cli {
    /// Also append ERROR events to a daily-rotated errors log in this directory
    #[arg(long, global = true, env = "WORKBRIDGE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sync service (one cycle, or continuously)
    Run(RunArgs),

    /// Validate configuration and probe the document store
    Check(ConfigArgs),
}

fn main() {
    // Variables already set in the environment win over `.env`.
    if let Err(e) = dotenv::dotenv() {
        if !e.not_found() {
            eprintln!("warning: could not load .env: {e}");
        }
    }
    let cli = Cli::parse();
    logging::init(cli.log_dir.as_deref());

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(commands::EXIT_STORE);
        }
    };

    let code = runtime.block_on(async {
        match cli.command {
            Commands::Run(args) => cmd_run(args).await,
            Commands::Check(args) => cmd_check(args).await,
        }
    });
    drop(runtime);
    process::exit(code);
}
