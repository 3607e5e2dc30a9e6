//! Read-only audit of the icon cache.
//!
//! Works from the manifest and the files on disk alone. The download
//! ledger is never consulted, so a deleted or stale ledger cannot hide
//! missing files.

use std::path::Path;

use tracing::{info, warn};

use crate::cache::{asset_path, default_icon_path, storage_bytes};
use crate::manifest::{CategoryKind, Manifest};

#[derive(Debug, Clone, PartialEq)]
pub struct VerifyReport {
    /// Ids with a cache file, ascending.
    pub existing: Vec<u64>,
    /// Ids without a cache file, ascending.
    pub missing: Vec<u64>,
    pub coverage_pct: f64,
    pub total_bytes: u64,
    pub has_default: bool,
    pub default_id: u64,
    pub categories: Vec<(String, CategoryKind)>,
}

impl VerifyReport {
    pub fn total(&self) -> usize {
        self.existing.len() + self.missing.len()
    }

    /// Every referenced icon is present, including the fallback.
    pub fn passed(&self) -> bool {
        self.missing.is_empty() && self.has_default
    }
}

pub fn verify(manifest: &Manifest, cache_dir: &Path) -> VerifyReport {
    let ids = manifest.collect_identifiers();
    let mut all = ids.assets;
    // Only an explicit `default` entry is expected as `<id>.png`; the
    // built-in fallback is only ever written as `default.png`.
    if let Some(default_id) = manifest.default_id() {
        all.insert(default_id);
    }

    let (existing, missing): (Vec<u64>, Vec<u64>) = all
        .iter()
        .copied()
        .partition(|&id| asset_path(cache_dir, id).is_file());

    let coverage_pct = coverage(existing.len(), all.len());
    let has_default = default_icon_path(cache_dir).is_file();

    let total_bytes = storage_bytes(cache_dir).unwrap_or_else(|e| {
        warn!(dir = %cache_dir.display(), error = %e, "Failed to measure cache storage");
        0
    });

    info!(
        total = all.len(),
        existing = existing.len(),
        missing = missing.len(),
        has_default,
        "Verified icon cache"
    );

    VerifyReport {
        existing,
        missing,
        coverage_pct,
        total_bytes,
        has_default,
        default_id: ids.default,
        categories: manifest.categories(),
    }
}

fn coverage(existing: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        existing as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LEDGER_FILE;
    use crate::manifest::FALLBACK_DEFAULT_ID;

    fn touch(dir: &Path, name: &str, len: usize) {
        std::fs::write(dir.join(name), vec![1u8; len]).unwrap();
    }

    #[test]
    fn test_partitions_by_presence_and_includes_default() {
        let dir = tempfile::tempdir().unwrap();
        let manifest =
            Manifest::from_json(r#"{"x": {"a": 1, "b": 2, "c": 3}, "default": 9}"#).unwrap();
        touch(dir.path(), "1.png", 10);
        touch(dir.path(), "3.png", 20);
        touch(dir.path(), "default.png", 5);

        let report = verify(&manifest, dir.path());

        assert_eq!(report.existing, vec![1, 3]);
        assert_eq!(report.missing, vec![2, 9]);
        assert_eq!(report.total(), 4);
        assert_eq!(report.coverage_pct, 50.0);
        assert!(report.has_default);
        assert_eq!(report.default_id, 9);
        assert_eq!(report.total_bytes, 35);
        assert!(!report.passed());
    }

    #[test]
    fn test_ignores_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::from_json(r#"{"x": {"a": 1}, "default": 1}"#).unwrap();
        std::fs::write(dir.path().join(LEDGER_FILE), r#"{"1": "abc"}"#).unwrap();

        let report = verify(&manifest, dir.path());
        assert_eq!(report.missing, vec![1]);

        touch(dir.path(), "1.png", 3);
        touch(dir.path(), "default.png", 3);
        std::fs::remove_file(dir.path().join(LEDGER_FILE)).unwrap();
        let report = verify(&manifest, dir.path());
        assert!(report.passed());
        assert_eq!(report.coverage_pct, 100.0);
    }

    #[test]
    fn test_empty_manifest_has_zero_coverage() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(coverage(0, 0), 0.0);
        let report = verify(&Manifest::from_json("{}").unwrap(), dir.path());
        assert_eq!(report.total(), 0);
        assert_eq!(report.coverage_pct, 0.0);
    }

    #[test]
    fn test_fallback_id_not_expected_without_default_entry() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::from_json(r#"{"x": {"a": 1, "b": 2}}"#).unwrap();
        touch(dir.path(), "1.png", 1);
        touch(dir.path(), "2.png", 1);
        touch(dir.path(), "default.png", 1);

        let report = verify(&manifest, dir.path());

        assert_eq!(report.existing, vec![1, 2]);
        assert!(report.missing.is_empty());
        assert_eq!(report.coverage_pct, 100.0);
        assert_eq!(report.default_id, FALLBACK_DEFAULT_ID);
        assert!(report.passed());
    }

    #[test]
    fn test_coverage_never_decreases_as_files_arrive() {
        let dir = tempfile::tempdir().unwrap();
        let manifest =
            Manifest::from_json(r#"{"x": {"a": 1, "b": 2, "c": 3, "d": 4}, "default": 1}"#)
                .unwrap();

        let mut last = verify(&manifest, dir.path());
        for id in [3, 1, 4, 2] {
            touch(dir.path(), &format!("{}.png", id), 1);
            let report = verify(&manifest, dir.path());
            assert!(report.existing.len() > last.existing.len());
            assert!(report.coverage_pct >= last.coverage_pct);
            last = report;
        }
        assert_eq!(last.coverage_pct, 100.0);
    }

    #[test]
    fn test_missing_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = Manifest::from_json(r#"{"x": {"a": 1}}"#).unwrap();
        let report = verify(&manifest, &dir.path().join("absent"));
        assert_eq!(report.existing.len(), 0);
        assert_eq!(report.total_bytes, 0);
        assert!(!report.has_default);
    }
}
