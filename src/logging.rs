//! Tracing subscriber setup.
//!
//! Console output always goes through a fmt layer. When the configuration
//! names a log directory, a second layer writes daily-rolling files through
//! a non-blocking appender.

use crate::config::ServiceConfig;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file prefix inside `log_dir`
pub const LOG_FILE_PREFIX: &str = "pipeline-services.log";

// Dropping the guard stops the file writer, so it lives for the process.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Build the filter: `RUST_LOG` wins, then the configured directive.
pub fn env_filter(config: &ServiceConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(&config.log_filter).unwrap_or_else(|e| {
            eprintln!(
                "Invalid log filter {:?} ({}), falling back to \"info\"",
                config.log_filter, e
            );
            EnvFilter::new("info")
        })
    })
}

/// Install the global subscriber.
///
/// Returns false if a subscriber was already installed, which makes repeated
/// calls harmless.
pub fn init(config: &ServiceConfig) -> bool {
    let file_layer = config.log_dir.as_ref().and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Cannot create log directory {:?}: {}", dir, e);
            return None;
        }
        let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
    });

    let installed = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Logging initialised (filter: {})", config.log_filter);
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_filter_falls_back() {
        let mut config = ServiceConfig::default();
        config.log_filter = "info,[[[".to_string();
        // Must not panic whatever RUST_LOG holds.
        let _ = env_filter(&config);
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServiceConfig::default();
        config.log_dir = Some(dir.path().join("logs"));

        let first = init(&config);
        let second = init(&config);
        assert!(!second || !first);
        assert!(dir.path().join("logs").is_dir());
    }
}
