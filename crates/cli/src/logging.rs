use std::env;
use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Days of error logs kept in the log directory.
const ERROR_LOG_RETENTION: usize = 7;

/// Install the global subscriber.
///
/// `WORKBRIDGE_LOG` takes an `EnvFilter` directive (default
/// `workbridge=info,warn`); `WORKBRIDGE_LOG_FORMAT=json` switches to JSON
/// lines. Logs go to stderr so `check` output stays clean on stdout.
///
/// With a `log_dir`, ERROR events are also appended to
/// `<log_dir>/errors.<date>.log`, rotated daily and pruned after a week.
pub fn init(log_dir: Option<&Path>) {
    let filter = EnvFilter::try_from_env("WORKBRIDGE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "workbridge=debug,info"
        } else {
            "workbridge=info,warn"
        })
    });

    let format = env::var("WORKBRIDGE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let error_file = log_dir.and_then(|dir| match error_appender(dir) {
        Ok(appender) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(appender)
                .with_filter(LevelFilter::ERROR),
        ),
        Err(e) => {
            eprintln!("warning: error log disabled: {e}");
            None
        }
    });

    let registry = tracing_subscriber::registry().with(error_file);

    match format.as_str() {
        "json" => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_ansi(false)
                        .with_writer(std::io::stderr)
                        .with_filter(filter),
                )
                .init();
        }
        _ => {
            registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_writer(std::io::stderr)
                        .with_filter(filter),
                )
                .init();
        }
    }
}

fn error_appender(dir: &Path) -> Result<RollingFileAppender, String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("could not create {}: {e}", dir.display()))?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("errors")
        .filename_suffix("log")
        .max_log_files(ERROR_LOG_RETENTION)
        .build(dir)
        .map_err(|e| e.to_string())
}
