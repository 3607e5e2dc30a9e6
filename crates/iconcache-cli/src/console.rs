//! Human-readable progress and summaries on stdout.
//!
//! Line builders are kept separate from printing so they can be tested.

use std::path::Path;

use iconcache_core::manifest::CategoryKind;
use iconcache_core::sync::{DefaultIcon, RunResult, SyncEvent};
use iconcache_core::utils::{format_elapsed, format_megabytes, format_percent};
use iconcache_core::VerifyReport;

const RULE_WIDTH: usize = 60;

/// Skipped assets are only echoed on the first and every Nth position.
const SKIP_ECHO_EVERY: usize = 10;

/// Missing files listed before the rest are summarized.
const MISSING_SHOWN: usize = 10;

pub fn print_header(title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    println!("{}", rule);
    println!("{:^width$}", title, width = RULE_WIDTH);
    println!("{}", rule);
}

pub fn print_info(msg: &str) {
    println!("[info] {}", msg);
}

pub fn print_error(msg: &str) {
    eprintln!("[error] {}", msg);
}

/// Turns sync events into progress lines.
#[derive(Debug, Default)]
pub struct SyncReporter;

impl SyncReporter {
    pub fn handle(&mut self, event: &SyncEvent) {
        if let Some(line) = event_line(event) {
            println!("{}", line);
        }
    }
}

pub fn event_line(event: &SyncEvent) -> Option<String> {
    match event {
        SyncEvent::Started { total } => Some(format!(
            "Found {} unique icon ids in manifest\nStarting icon download process...\n",
            total
        )),
        SyncEvent::Skipped { position, total, id } => {
            (*position == 1 || *position % SKIP_ECHO_EVERY == 0)
                .then(|| format!("[{}/{}] Skipping {} (already downloaded)", position, total, id))
        }
        SyncEvent::Downloaded {
            position,
            total,
            id,
            refreshed,
            ..
        } => Some(format!(
            "[{}/{}] Downloading {}... Done{}",
            position,
            total,
            id,
            if *refreshed { " (updated)" } else { "" }
        )),
        SyncEvent::Failed {
            position,
            total,
            id,
            error,
        } => Some(format!("[{}/{}] Downloading {}... Failed: {}", position, total, id, error)),
        SyncEvent::Interrupted { completed, total } => Some(format!(
            "\nDownload interrupted by user after {} of {} icons",
            completed, total
        )),
        SyncEvent::LedgerSaved { .. } => None,
        SyncEvent::FetchingDefault { id } => {
            Some(format!("[info] Downloading default fallback icon {}...", id))
        }
    }
}

pub fn sync_summary_lines(result: &RunResult, cache_dir: &Path) -> Vec<String> {
    let stats = &result.stats;
    let mut lines = vec![
        format!("Total icons in manifest: {}", stats.total),
        format!("Successfully downloaded: {}", stats.downloaded),
    ];
    if stats.updated > 0 {
        lines.push(format!("  of which refreshed: {}", stats.updated));
    }
    lines.push(format!("Skipped (unchanged): {}", stats.skipped));
    if stats.failed > 0 {
        lines.push(format!("Failed downloads: {}", stats.failed));
        if stats.not_found > 0 {
            lines.push(format!("  not found on CDN (404): {}", stats.not_found));
        }
    } else {
        lines.push("No failures!".to_string());
    }

    match &result.default_icon {
        DefaultIcon::AlreadyPresent => {}
        DefaultIcon::Fetched { id } => lines.push(format!("Default fallback icon: {}", id)),
        DefaultIcon::Failed { id, reason } => {
            lines.push(format!("Default fallback icon {} failed: {}", id, reason))
        }
        DefaultIcon::NotAttempted => lines.push("Default fallback icon: not attempted".to_string()),
    }

    lines.push(format!(
        "Elapsed: {}",
        format_elapsed(result.finished_at - result.started_at)
    ));
    lines.push(format!("Icons stored in: {}", cache_dir.display()));

    if result.interrupted {
        lines.push("Sync was interrupted; progress so far has been saved".to_string());
    } else if result.threshold_breached {
        lines.push("Warning: Too many downloads failed".to_string());
    } else {
        lines.push("Icon cache update complete!".to_string());
    }
    lines
}

pub fn print_sync_summary(result: &RunResult, cache_dir: &Path) {
    println!();
    print_header("Download Summary");
    for line in sync_summary_lines(result, cache_dir) {
        println!("{}", line);
    }
}

pub fn verify_report_lines(report: &VerifyReport) -> Vec<String> {
    let mut lines = vec![
        format!("Total unique ids in manifest: {}", report.total()),
        format!("Existing icons: {}", report.existing.len()),
        format!("Missing icons: {}", report.missing.len()),
        format!(
            "Default fallback icon ({}): {}",
            report.default_id,
            if report.has_default { "present" } else { "MISSING" }
        ),
        String::new(),
        format!("Coverage: {}", format_percent(report.coverage_pct)),
        String::new(),
    ];

    if report.missing.is_empty() {
        lines.push("All icons are present!".to_string());
    } else {
        lines.push("Missing icons:".to_string());
        for id in report.missing.iter().take(MISSING_SHOWN) {
            lines.push(format!("   - {}.png", id));
        }
        if report.missing.len() > MISSING_SHOWN {
            lines.push(format!(
                "   ... and {} more",
                report.missing.len() - MISSING_SHOWN
            ));
        }
        lines.push(String::new());
        lines.push("Run 'iconcache-sync' to download missing icons".to_string());
    }

    lines.push(String::new());
    lines.push("Manifest categories:".to_string());
    for (name, kind) in &report.categories {
        match kind {
            CategoryKind::Items(count) => lines.push(format!("   - {}: {} items", name, count)),
            CategoryKind::Default(Some(id)) => lines.push(format!("   - {}: {}", name, id)),
            CategoryKind::Default(None) => lines.push(format!("   - {}: (invalid)", name)),
            CategoryKind::Other => {}
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Total icon storage: {}",
        format_megabytes(report.total_bytes)
    ));
    lines.push(String::new());
    lines.push(if report.passed() {
        "Icon cache verification passed!".to_string()
    } else {
        "Icon cache has issues - see above".to_string()
    });
    lines
}

pub fn print_verify_report(report: &VerifyReport) {
    for line in verify_report_lines(report) {
        println!("{}", line);
    }
}
