//! Shared plumbing for the `iconcache-sync` and `iconcache-verify` binaries.

pub mod console;

use std::io;

use anyhow::Result;
use iconcache_core::{AppConfig, Settings};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log file name prefix used when `ICONCACHE_LOG_DIR` is set.
const LOG_FILE_PREFIX: &str = "iconcache.log";

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` controls the level (default `warn`). Logs go to stderr so
/// they never interleave with the progress output on stdout. When
/// `ICONCACHE_LOG_DIR` is set, a daily-rolling log file is written there
/// too; keep the returned guard alive until exit so it gets flushed.
pub fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var_os("ICONCACHE_LOG_DIR") {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// Resolve settings from `.env`, the user config file and the environment.
pub fn load_settings() -> Result<Settings> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut config = AppConfig::load()?;
    config.apply_env(|key| std::env::var(key).ok())?;
    config.resolve()
}
