//! Cache synchronization.
//!
//! A run walks every asset id in the manifest, skips ids whose cache file
//! still matches the ledger, downloads the rest, persists the ledger and
//! finally makes sure the fallback icon exists.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{asset_path, default_icon_path};
use crate::config::{Settings, SyncConfig};
use crate::fetch::{AssetSource, FetchError, Fetcher, HttpSource};
use crate::ledger::{hash_of, Ledger, LedgerError};
use crate::manifest::Manifest;

/// Errors that abort a whole run.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to create cache directory {path}: {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to persist download ledger: {0}")]
    Ledger(#[from] LedgerError),
}

/// Why a single asset counts as failed.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Download reported success but {0} is missing")]
    MissingAfterWrite(PathBuf),

    #[error("Failed to hash {path}: {source}")]
    Hash {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl AssetError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AssetError::Fetch(FetchError::NotFound))
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub skipped: usize,
    pub downloaded: usize,
    /// Downloads of ids that already had a ledger entry.
    pub updated: usize,
    pub failed: usize,
    /// Failures caused by a 404; also included in `failed`.
    pub not_found: usize,
}

impl RunStats {
    /// True when strictly more than `threshold` of the candidates failed.
    pub fn failure_ratio_exceeded(&self, threshold: f64) -> bool {
        self.failed as f64 > threshold * self.total as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
        }
    }
}

/// What happened to `default.png` at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultIcon {
    AlreadyPresent,
    Fetched { id: u64 },
    Failed { id: u64, reason: String },
    NotAttempted,
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub stats: RunStats,
    pub exit_status: ExitStatus,
    pub threshold_breached: bool,
    pub interrupted: bool,
    pub default_icon: DefaultIcon,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Progress notifications, delivered in manifest order.
#[derive(Debug)]
pub enum SyncEvent {
    Started { total: usize },
    Skipped { position: usize, total: usize, id: u64 },
    Downloaded { position: usize, total: usize, id: u64, bytes: u64, refreshed: bool },
    Failed { position: usize, total: usize, id: u64, error: AssetError },
    Interrupted { completed: usize, total: usize },
    LedgerSaved { entries: usize },
    FetchingDefault { id: u64 },
}

enum Outcome {
    Skipped,
    Downloaded { hash: String, bytes: u64 },
    Failed(AssetError),
}

pub struct Synchronizer<S> {
    fetcher: Fetcher<S>,
    cache_dir: PathBuf,
    failure_threshold: f64,
    concurrency: usize,
}

impl Synchronizer<HttpSource> {
    /// Synchronizer talking to the configured CDN.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let source = HttpSource::new(&settings.sync)?;
        Ok(Self::new(source, settings.cache_dir.clone(), &settings.sync))
    }
}

impl<S: AssetSource> Synchronizer<S> {
    pub fn new(source: S, cache_dir: PathBuf, config: &SyncConfig) -> Self {
        Self {
            fetcher: Fetcher::new(source, config),
            cache_dir,
            failure_threshold: config.failure_threshold,
            concurrency: config.concurrency.max(1),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn source(&self) -> &S {
        self.fetcher.source()
    }

    /// Run to completion without progress reporting.
    pub async fn run(&self, manifest: &Manifest, ledger: &mut Ledger) -> Result<RunResult, SyncError> {
        self.run_until(manifest, ledger, std::future::pending::<()>(), |_| {})
            .await
    }

    /// Run until finished or until `shutdown` resolves.
    ///
    /// On shutdown no new downloads are started, in-flight ones are
    /// dropped, and the ledger is still saved for everything completed so
    /// far. An interrupted run always reports `ExitStatus::Failure`.
    pub async fn run_until<F, C>(
        &self,
        manifest: &Manifest,
        ledger: &mut Ledger,
        shutdown: F,
        mut on_event: C,
    ) -> Result<RunResult, SyncError>
    where
        F: Future<Output = ()>,
        C: FnMut(&SyncEvent),
    {
        let started_at = Utc::now();
        std::fs::create_dir_all(&self.cache_dir).map_err(|source| SyncError::CacheDir {
            path: self.cache_dir.clone(),
            source,
        })?;

        let ids = manifest.collect_identifiers();
        let total = ids.assets.len();
        let mut stats = RunStats {
            total,
            ..RunStats::default()
        };
        info!(total, cache_dir = %self.cache_dir.display(), "Starting icon sync");
        on_event(&SyncEvent::Started { total });

        // Snapshot recorded hashes up front so the consumer loop below is
        // the only place that writes to the ledger.
        let jobs: Vec<(usize, u64, Option<String>)> = ids
            .assets
            .iter()
            .enumerate()
            .map(|(i, &id)| (i + 1, id, ledger.hash_for(id).map(str::to_owned)))
            .collect();

        let outcomes = stream::iter(jobs)
            .map(|(position, id, recorded)| async move {
                let outcome = self.process(id, recorded.as_deref()).await;
                (position, id, outcome)
            })
            .buffered(self.concurrency);
        tokio::pin!(outcomes);
        tokio::pin!(shutdown);

        let mut interrupted = false;
        let mut completed = 0;
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    interrupted = true;
                    warn!(completed, total, "Sync interrupted");
                    on_event(&SyncEvent::Interrupted { completed, total });
                    break;
                }
                next = outcomes.next() => {
                    let Some((position, id, outcome)) = next else { break };
                    completed += 1;
                    match outcome {
                        Outcome::Skipped => {
                            stats.skipped += 1;
                            on_event(&SyncEvent::Skipped { position, total, id });
                        }
                        Outcome::Downloaded { hash, bytes } => {
                            let refreshed = ledger.record(id, hash).is_some();
                            stats.downloaded += 1;
                            if refreshed {
                                stats.updated += 1;
                            }
                            on_event(&SyncEvent::Downloaded { position, total, id, bytes, refreshed });
                        }
                        Outcome::Failed(error) => {
                            stats.failed += 1;
                            if error.is_not_found() {
                                stats.not_found += 1;
                            }
                            on_event(&SyncEvent::Failed { position, total, id, error });
                        }
                    }
                }
            }
        }

        // Persist even when some downloads failed, so progress is kept.
        ledger.save()?;
        on_event(&SyncEvent::LedgerSaved {
            entries: ledger.len(),
        });

        let default_icon = if interrupted {
            DefaultIcon::NotAttempted
        } else {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    interrupted = true;
                    DefaultIcon::NotAttempted
                }
                resolved = self.resolve_default(ids.default, &mut on_event) => resolved,
            }
        };

        let threshold_breached = stats.failure_ratio_exceeded(self.failure_threshold);
        let exit_status = if interrupted || threshold_breached {
            ExitStatus::Failure
        } else {
            ExitStatus::Success
        };

        info!(
            downloaded = stats.downloaded,
            skipped = stats.skipped,
            failed = stats.failed,
            ?exit_status,
            "Icon sync finished"
        );

        Ok(RunResult {
            stats,
            exit_status,
            threshold_breached,
            interrupted,
            default_icon,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn process(&self, id: u64, recorded: Option<&str>) -> Outcome {
        let path = asset_path(&self.cache_dir, id);

        if let Some(recorded) = recorded {
            match hash_file(path.clone()).await {
                Ok(Some(current)) if current == recorded => return Outcome::Skipped,
                Ok(Some(_)) => debug!(id, "Cached file differs from ledger, re-fetching"),
                Ok(None) => debug!(id, "Cached file missing, re-fetching"),
                Err(e) => debug!(id, error = %e, "Could not hash cached file, re-fetching"),
            }
        }

        let bytes = match self.fetcher.fetch(id, &path).await {
            Ok(bytes) => bytes,
            Err(e) => return Outcome::Failed(e.into()),
        };

        // The fetcher's result is the primary signal; the file on disk
        // must corroborate it before the asset counts as downloaded.
        match hash_file(path.clone()).await {
            Ok(Some(hash)) => Outcome::Downloaded { hash, bytes },
            Ok(None) => Outcome::Failed(AssetError::MissingAfterWrite(path)),
            Err(source) => Outcome::Failed(AssetError::Hash { path, source }),
        }
    }

    /// Fetch the fallback icon straight into `default.png` if it is absent.
    /// Not subject to the ledger.
    async fn resolve_default<C>(&self, id: u64, on_event: &mut C) -> DefaultIcon
    where
        C: FnMut(&SyncEvent),
    {
        let path = default_icon_path(&self.cache_dir);
        if path.exists() {
            return DefaultIcon::AlreadyPresent;
        }

        info!(id, "Downloading default fallback icon");
        on_event(&SyncEvent::FetchingDefault { id });
        match self.fetcher.fetch(id, &path).await {
            Ok(_) => DefaultIcon::Fetched { id },
            Err(e) => DefaultIcon::Failed {
                id,
                reason: e.to_string(),
            },
        }
    }
}

/// Hash a cache file on the blocking pool so large files do not stall the
/// runtime's worker threads.
async fn hash_file(path: PathBuf) -> io::Result<Option<String>> {
    tokio::task::spawn_blocking(move || hash_of(&path))
        .await
        .map_err(io::Error::other)?
}
