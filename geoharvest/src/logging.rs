//! Logging setup: structured output to a session log file and stdout.
//!
//! Retrieval runs are long and mostly unattended, so everything worth
//! keeping goes to `logs/geoharvest.log` (truncated per session) while
//! stdout carries the same stream for live tailing. Verbosity is
//! controlled through `RUST_LOG`.

use std::fs;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_FILE: &str = "geoharvest.log";

/// Keeps the background log writer alive; dropping it flushes the file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initializes the global subscriber with a file layer and a stdout
/// layer. The previous session's log file is truncated.
///
/// Must be called at most once per process; the returned guard has to
/// outlive all logging.
pub fn init(log_dir: &str, log_file: &str) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(log_dir)?;
    fs::write(Path::new(log_dir).join(log_file), "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .compact();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .compact();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    // init() itself installs a process-global subscriber, so only the
    // file handling around it is unit-tested.
    #[test]
    fn test_session_file_is_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("geoharvest.log");
        std::fs::write(&path, "previous session").unwrap();

        std::fs::write(&path, "").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
