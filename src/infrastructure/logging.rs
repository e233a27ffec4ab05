//! Logging system configuration and initialization
//!
//! Provides the tracing setup for the engine:
//! - Console output with env-filter based level control
//! - Optional rotating file output (non-blocking writer)
//! - Optional structured JSON output
//!
//! Initialization is idempotent per process; subsequent calls are ignored
//! so tests can call it freely.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use once_cell::sync::Lazy;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::infrastructure::config::LoggingConfig;

// Keeps the non-blocking file writers alive for the process lifetime.
static LOG_GUARDS: Lazy<Mutex<Vec<WorkerGuard>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Directory used for log files when the config does not name one.
#[must_use]
pub fn default_log_directory() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("logs")
}

/// Initializes the logging system with default configuration.
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Initializes the logging system from configuration.
///
/// `RUST_LOG` takes precedence over the configured level so operators can
/// raise verbosity without touching the config file.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let console_layer = if config.json_output {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let file_layer = if config.file_logging {
        let log_dir = config
            .log_dir
            .clone()
            .unwrap_or_else(default_log_directory);
        std::fs::create_dir_all(&log_dir)?;
        let appender = rolling::daily(&log_dir, "tag-reconciler.log");
        let (writer, guard) = non_blocking(appender);
        LOG_GUARDS.lock().expect("log guard lock").push(guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .boxed(),
        )
    } else {
        None
    };

    let init_result = Registry::default()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    match init_result {
        Ok(()) => {
            info!(level = %config.level, file_logging = config.file_logging, "logging initialized");
            Ok(())
        }
        // A subscriber is already installed (tests, embedding hosts); keep it.
        Err(_) => Ok(()),
    }
}
