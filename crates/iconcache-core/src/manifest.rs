//! Icon manifest loading and identifier collection.
//!
//! The manifest is a JSON document mapping category names to either a
//! `name -> asset id` object or, for the reserved `default` category, a
//! single asset id. It is produced elsewhere; this module only reads it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Reserved category holding the fallback icon id.
pub const DEFAULT_CATEGORY: &str = "default";

/// Fallback icon id used when the manifest carries no `default` entry.
pub const FALLBACK_DEFAULT_ID: u64 = 1458010785;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Manifest not found at {0}")]
    Missing(PathBuf),

    #[error("Invalid JSON in manifest {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Category listing as found in the manifest, in file order.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryKind {
    /// Ordinary category with this many entries (including non-asset metadata).
    Items(usize),
    /// The `default` category and the id it names, if it is a valid id.
    Default(Option<u64>),
    /// Anything else at the top level.
    Other,
}

#[derive(Debug, Clone)]
pub struct Manifest {
    categories: Map<String, Value>,
}

/// Identifiers referenced by a manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestIds {
    /// Every asset id found in ordinary categories, ascending.
    pub assets: BTreeSet<u64>,
    /// The fallback icon id, kept apart from `assets`.
    pub default: u64,
}

/// Filter predicate for manifest entries: only non-negative JSON integers
/// are asset ids. Strings, floats, booleans and nested objects are
/// auxiliary metadata and are ignored.
pub fn asset_id_of(value: &Value) -> Option<u64> {
    value.as_u64()
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManifestError::Missing(path.to_path_buf()));
            }
            Err(e) => {
                return Err(ManifestError::Io {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };

        Self::from_json(&contents).map_err(|reason| ManifestError::Corrupt {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse a manifest document. The top level must be a JSON object.
    pub fn from_json(contents: &str) -> Result<Self, String> {
        match serde_json::from_str::<Value>(contents) {
            Ok(Value::Object(categories)) => {
                debug!(categories = categories.len(), "Parsed icon manifest");
                Ok(Self { categories })
            }
            Ok(_) => Err("top level is not an object".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    /// The id named by the `default` category, if present and valid.
    pub fn default_id(&self) -> Option<u64> {
        self.categories.get(DEFAULT_CATEGORY).and_then(asset_id_of)
    }

    /// Collect every referenced asset id, sorted, plus the fallback id.
    pub fn collect_identifiers(&self) -> ManifestIds {
        let assets = self
            .categories
            .iter()
            .filter(|(name, _)| name.as_str() != DEFAULT_CATEGORY)
            .filter_map(|(_, items)| items.as_object())
            .flat_map(|items| items.values().filter_map(asset_id_of))
            .collect();

        ManifestIds {
            assets,
            default: self.default_id().unwrap_or(FALLBACK_DEFAULT_ID),
        }
    }

    /// Top-level categories sorted by name.
    pub fn categories(&self) -> Vec<(String, CategoryKind)> {
        let mut out: Vec<(String, CategoryKind)> = self
            .categories
            .iter()
            .map(|(name, value)| {
                let kind = if name == DEFAULT_CATEGORY {
                    CategoryKind::Default(asset_id_of(value))
                } else if let Some(items) = value.as_object() {
                    CategoryKind::Items(items.len())
                } else {
                    CategoryKind::Other
                };
                (name.clone(), kind)
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "subclasses": { "arc": 300, "solar": 100, "void": 200 },
        "abilities": { "grenade": 100, "melee": "todo", "super": 12.5, "neg": -4 },
        "meta": { "version": "1.2" },
        "notes": "free text",
        "default": 42
    }"#;

    #[test]
    fn test_collect_identifiers_sorted_and_deduplicated() {
        let manifest = Manifest::from_json(SAMPLE).unwrap();
        let ids = manifest.collect_identifiers();
        assert_eq!(ids.assets.into_iter().collect::<Vec<_>>(), vec![100, 200, 300]);
        assert_eq!(ids.default, 42);
    }

    #[test]
    fn test_default_not_mixed_into_assets() {
        let manifest = Manifest::from_json(r#"{"a": {"x": 1}, "default": 2}"#).unwrap();
        let ids = manifest.collect_identifiers();
        assert!(!ids.assets.contains(&2));
    }

    #[test]
    fn test_missing_default_uses_fallback() {
        let manifest = Manifest::from_json(r#"{"a": {"x": 1}}"#).unwrap();
        assert_eq!(manifest.collect_identifiers().default, FALLBACK_DEFAULT_ID);

        let manifest = Manifest::from_json(r#"{"default": "nope"}"#).unwrap();
        assert_eq!(manifest.default_id(), None);
        assert_eq!(manifest.collect_identifiers().default, FALLBACK_DEFAULT_ID);
    }

    #[test]
    fn test_asset_id_filter() {
        assert_eq!(asset_id_of(&serde_json::json!(7)), Some(7));
        assert_eq!(asset_id_of(&serde_json::json!(0)), Some(0));
        assert_eq!(asset_id_of(&serde_json::json!(-1)), None);
        assert_eq!(asset_id_of(&serde_json::json!(1.0)), None);
        assert_eq!(asset_id_of(&serde_json::json!("7")), None);
        assert_eq!(asset_id_of(&serde_json::json!(true)), None);
        assert_eq!(asset_id_of(&serde_json::json!({"id": 7})), None);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Manifest::load(&dir.path().join("icons.json")).unwrap_err();
        assert!(matches!(err, ManifestError::Missing(_)));
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icons.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Manifest::load(&path).unwrap_err(),
            ManifestError::Corrupt { .. }
        ));

        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            Manifest::load(&path).unwrap_err(),
            ManifestError::Corrupt { .. }
        ));
    }

    #[test]
    fn test_categories_listing() {
        let manifest = Manifest::from_json(SAMPLE).unwrap();
        let categories = manifest.categories();
        let names: Vec<_> = categories.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["abilities", "default", "meta", "notes", "subclasses"]);
        assert_eq!(categories[0].1, CategoryKind::Items(4));
        assert_eq!(categories[1].1, CategoryKind::Default(Some(42)));
        assert_eq!(categories[3].1, CategoryKind::Other);
    }
}
