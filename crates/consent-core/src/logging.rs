//! Log setup.
//!
//! The terminal belongs to the TUI while a study runs, so logs go to a daily
//! rolling file under `${CONSENT_HOME}/logs`. Verbosity comes from
//! `CONSENT_LOG` (an `EnvFilter` directive, default `info`).

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "CONSENT_LOG";

const LOG_FILE_PREFIX: &str = "consent.log";

/// Installs the global subscriber writing to `dir`.
///
/// Keep the returned guard alive for the process lifetime; dropping it
/// flushes and stops the background writer.
///
/// # Errors
/// Returns an error if the directory cannot be created or a subscriber is
/// already installed.
pub fn init(dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {e}"))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_init_creates_log_directory() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("logs");

        // Another test may already own the global subscriber; the directory
        // is created before installation either way.
        let _guard = init(&logs);
        assert!(logs.is_dir());
    }
}
