//! Cache directory layout.
//!
//! The cache is a flat directory of `<id>.png` files plus a single
//! `default.png` fallback icon.

use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Fixed name of the fallback icon.
pub const DEFAULT_ICON_FILE: &str = "default.png";

const ICON_EXTENSION: &str = "png";

pub fn asset_path(cache_dir: &Path, id: u64) -> PathBuf {
    cache_dir.join(format!("{}.{}", id, ICON_EXTENSION))
}

pub fn default_icon_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(DEFAULT_ICON_FILE)
}

/// Total size in bytes of every `.png` file directly inside `cache_dir`.
/// A missing directory counts as empty.
pub fn storage_bytes(cache_dir: &Path) -> io::Result<u64> {
    let entries = match std::fs::read_dir(cache_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut total = 0;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(ICON_EXTENSION) {
            continue;
        }
        let metadata = entry.metadata()?;
        if metadata.is_file() {
            total += metadata.len();
        }
    }

    debug!(dir = %cache_dir.display(), bytes = total, "Measured cache storage");
    Ok(total)
}
