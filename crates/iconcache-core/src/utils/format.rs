use chrono::TimeDelta;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Format a byte count as megabytes with two decimals.
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / BYTES_PER_MB)
}

/// Format a percentage with one decimal.
pub fn format_percent(pct: f64) -> String {
    format!("{:.1}%", pct)
}

/// Short human form of a run duration, e.g. `850ms`, `12.3s`, `4m 05s`.
pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let ms = elapsed.num_milliseconds().max(0);
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let secs = ms / 1000;
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}
