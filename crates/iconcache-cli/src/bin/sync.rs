//! Synchronize the local icon cache with the manifest.

use std::process::ExitCode;

use anyhow::{Context, Result};
use iconcache_cli::console::{self, SyncReporter};
use iconcache_cli::{init_tracing, load_settings};
use iconcache_core::{Ledger, Manifest, Synchronizer};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let _guard = init_tracing();
    info!("iconcache-sync starting");

    match run().await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Sync aborted");
            console::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let settings = load_settings()?;

    console::print_header("Icon Cache Sync");
    console::print_info(&format!("Icons directory: {}", settings.cache_dir.display()));
    console::print_info("Loading icon manifest...");

    // Manifest problems abort before any network activity.
    let manifest = Manifest::load(&settings.manifest_path)?;

    let synchronizer =
        Synchronizer::from_settings(&settings).context("Failed to build HTTP client")?;
    let mut ledger = Ledger::in_cache_dir(&settings.cache_dir);
    let mut reporter = SyncReporter::default();

    let result = synchronizer
        .run_until(&manifest, &mut ledger, shutdown_signal(), |event| {
            reporter.handle(event)
        })
        .await?;

    console::print_sync_summary(&result, &settings.cache_dir);
    Ok(ExitCode::from(result.exit_status.code() as u8))
}

/// Resolves on Ctrl-C. If the handler cannot be installed the run simply
/// cannot be interrupted.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
