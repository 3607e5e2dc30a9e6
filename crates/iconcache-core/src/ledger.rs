//! Persisted download ledger.
//!
//! Maps each asset id (as a string key) to the MD5 digest of the cache file
//! as it was right after the last successful download. The ledger is an
//! optimization for skipping redundant downloads, not a source of truth:
//! a missing or unreadable ledger simply loads as empty.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

/// Ledger file name inside the cache directory.
pub const LEDGER_FILE: &str = ".download_log.json";

/// Read size used when hashing cache files.
const HASH_CHUNK_SIZE: usize = 4096;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Failed to serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write ledger {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl Ledger {
    /// Empty ledger that will be saved to `path`.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            entries: BTreeMap::new(),
        }
    }

    /// Ledger stored in the standard location inside `cache_dir`.
    pub fn in_cache_dir(cache_dir: &Path) -> Self {
        Self::load(cache_dir.join(LEDGER_FILE))
    }

    /// Load the ledger, falling back to an empty one if the file is
    /// missing or does not parse.
    pub fn load(path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring unreadable download ledger");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read download ledger");
                BTreeMap::new()
            }
        };

        debug!(path = %path.display(), entries = entries.len(), "Loaded download ledger");
        Self { path, entries }
    }

    /// Overwrite the ledger file. The new contents are written to a
    /// temporary file in the same directory and renamed into place, so a
    /// crash never leaves a half-written ledger behind.
    pub fn save(&self) -> Result<(), LedgerError> {
        let contents = serde_json::to_string_pretty(&self.entries)?;
        let write_err = |source| LedgerError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(write_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(contents.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;

        debug!(path = %self.path.display(), entries = self.entries.len(), "Saved download ledger");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recorded digest for an asset id.
    pub fn hash_for(&self, id: u64) -> Option<&str> {
        self.entries.get(&id.to_string()).map(String::as_str)
    }

    /// Record the digest of a freshly written file. Returns the previous
    /// digest, if any.
    pub fn record(&mut self, id: u64, hash: String) -> Option<String> {
        self.entries.insert(id.to_string(), hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// MD5 of a file as lowercase hex, read in fixed-size chunks.
/// Returns `Ok(None)` if the file does not exist.
pub fn hash_of(path: &Path) -> io::Result<Option<String>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut context = md5::Context::new();
    let mut buf = [0u8; HASH_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        context.consume(&buf[..n]);
    }

    Ok(Some(format!("{:x}", context.finalize())))
}
