use std::path::Path;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{AssetSource, FetchError};
use crate::config::SyncConfig;

/// Global politeness gate for the CDN.
///
/// At most one request is in flight at a time across all workers, and the
/// next one may not start until `interval` after the previous one finished.
/// Every attempt, including retries and failed ones, goes through here.
pub struct Pacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

/// Held for the duration of one request. Dropping it stamps the earliest
/// start time of the next request, also when the request was cancelled.
pub struct PacerPermit<'a> {
    interval: Duration,
    next_slot: MutexGuard<'a, Option<Instant>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub async fn acquire(&self) -> PacerPermit<'_> {
        let next_slot = self.next_slot.lock().await;
        if let Some(at) = *next_slot {
            tokio::time::sleep_until(at).await;
        }
        PacerPermit {
            interval: self.interval,
            next_slot,
        }
    }
}

impl Drop for PacerPermit<'_> {
    fn drop(&mut self) {
        *self.next_slot = Some(Instant::now() + self.interval);
    }
}

/// Retrying wrapper around an `AssetSource`.
pub struct Fetcher<S> {
    source: S,
    pacer: Pacer,
    max_attempts: u32,
    attempt_timeout: Duration,
    retry_backoff: Duration,
}

impl<S: AssetSource> Fetcher<S> {
    pub fn new(source: S, config: &SyncConfig) -> Self {
        Self {
            source,
            pacer: Pacer::new(config.politeness_delay),
            max_attempts: config.max_attempts.max(1),
            attempt_timeout: config.attempt_timeout,
            retry_backoff: config.retry_backoff,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Download `id` into `dest`, retrying transient failures.
    ///
    /// A 404 or a local write error ends the attempt sequence at once.
    /// On failure `dest` may hold whatever a partial write produced.
    pub async fn fetch(&self, id: u64, dest: &Path) -> Result<u64, FetchError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let permit = self.pacer.acquire().await;
            let result = self.source.download(id, dest, self.attempt_timeout).await;
            drop(permit);

            match result {
                Ok(bytes) => {
                    debug!(id, attempt, bytes, "Downloaded asset");
                    return Ok(bytes);
                }
                Err(FetchError::NotFound) => {
                    warn!(id, "Asset not found (404) - skipping");
                    return Err(FetchError::NotFound);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(id, attempt, error = %e, "Download failed, retrying");
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(e) => {
                    warn!(id, attempts = attempt, error = %e, "Giving up on asset");
                    return Err(e);
                }
            }
        }
    }
}
