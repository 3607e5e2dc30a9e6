//! Audit the icon cache against the manifest.

use std::process::ExitCode;

use anyhow::Result;
use iconcache_cli::console;
use iconcache_cli::{init_tracing, load_settings};
use iconcache_core::{verify, Manifest};
use tracing::error;

fn main() -> ExitCode {
    let _guard = init_tracing();

    match run() {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Verification aborted");
            console::print_error(&format!("Error during verification: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let settings = load_settings()?;

    console::print_header("Icon Cache Verification");
    console::print_info(&format!("Icons directory: {}", settings.cache_dir.display()));
    console::print_info(&format!("Manifest: {}", settings.manifest_path.display()));
    println!();

    let manifest = Manifest::load(&settings.manifest_path)?;
    let report = verify(&manifest, &settings.cache_dir);
    console::print_verify_report(&report);

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
