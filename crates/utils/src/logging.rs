//! provides logging helpers

use std::env;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::{self};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry;

/// Environment variable naming a log file; logs go to stderr when unset.
pub const LOG_PATH_ENV_VAR: &str = "PVC_CLEANER_LOG_PATH";

const DEFAULT_LOG_PREFIX: &str = "pvc-cleaner.log";

/// initiate the global tracing subscriber
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process when file logging is enabled.
pub fn init() -> Option<WorkerGuard> {
    let env_filter = filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy();

    match env::var(LOG_PATH_ENV_VAR).ok().filter(|p| !p.is_empty()) {
        Some(log_path) => {
            let (rotation_dir, prefix) = split_log_path(Path::new(&log_path));
            match RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(prefix)
                .max_log_files(3)
                .build(rotation_dir)
            {
                Ok(appender) => {
                    let (file_writer, guard) = tracing_appender::non_blocking(appender);
                    let fmt_layer = layer()
                        .with_writer(file_writer)
                        .with_ansi(false)
                        .with_target(true)
                        .with_filter(env_filter);
                    registry().with(fmt_layer).init();
                    Some(guard)
                }
                Err(err) => {
                    init_stderr(env_filter);
                    tracing::error!(
                        "failed to create rolling file appender at {}: {err}; falling back to stderr",
                        rotation_dir.display()
                    );
                    None
                }
            }
        }
        None => {
            init_stderr(env_filter);
            None
        }
    }
}

fn init_stderr(env_filter: filter::EnvFilter) {
    let fmt_layer = layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(env_filter);

    registry().with(fmt_layer).init();
}

/// Split a configured log path into the rotation directory and file prefix.
fn split_log_path(log_path: &Path) -> (&Path, &str) {
    if log_path.is_dir() {
        return (log_path, DEFAULT_LOG_PREFIX);
    }
    let parent = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = log_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_PREFIX);
    (parent, prefix)
}
