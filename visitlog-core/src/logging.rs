//! Logging infrastructure for visitlog
//!
//! By default logs go to `~/.local/state/visitlog/visitlog.log` following XDG
//! standards. The CLI can mirror them to stderr with `--verbose`.
//!
//! Delivery fallbacks, storage failures and the unimplemented batch upload are
//! diagnostics only and are logged at `debug`; report outcomes at `info`.

use crate::config::{Config, LoggingConfig};
use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Where log lines are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// Rolling file in the state directory only
    File,
    /// Rolling file plus a human-readable copy on stderr
    FileAndStderr,
}

/// Initialize the logging system
///
/// Sets up tracing with:
/// - File output to XDG state directory, rotated daily
/// - Optional stderr mirror
/// - Configurable log level via config or RUST_LOG env var
pub fn init(config: &LoggingConfig, target: LogTarget) -> crate::error::Result<LoggingGuard> {
    let log_dir = Config::state_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "visitlog.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match target {
        LogTarget::File => {
            tracing_subscriber::registry()
                .with(filter)
                .with(file_layer)
                .init();
        }
        LogTarget::FileAndStderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(file_layer)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false)
                        .compact(),
                )
                .init();
        }
    }

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        ?target,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Initialize logging for tests (logs to stdout)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Keeps the non-blocking file writer alive; flushes on drop.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Returns the log file path
pub fn log_file_path() -> PathBuf {
    Config::log_path()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_path() {
        let path = log_file_path();
        assert!(path.ends_with("visitlog.log"));
    }
}
