//! Runtime configuration.
//!
//! Settings come from three layers, later layers winning:
//! built-in defaults, an optional `~/.config/iconcache/config.json`, and
//! `ICONCACHE_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for the config directory path
const APP_NAME: &str = "iconcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// CDN URL template; `{}` is replaced by the asset id.
pub const DEFAULT_BASE_URL: &str = "https://data.destinysets.com/assets/400/{}.png";

/// Project-relative manifest location.
pub const DEFAULT_MANIFEST_PATH: &str = "src/data/icons.json";

/// Project-relative cache directory.
pub const DEFAULT_CACHE_DIR: &str = "public/icons";

/// Attempts per asset before giving up on transient errors.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Per-attempt request timeout.
const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 10;

/// Wait between retries of the same asset.
const DEFAULT_RETRY_BACKOFF_SECS: u64 = 1;

/// Pause after each CDN request finishes before the next one may start.
const DEFAULT_POLITENESS_DELAY_MS: u64 = 100;

/// A run fails when more than this fraction of candidates failed.
const DEFAULT_FAILURE_THRESHOLD: f64 = 0.10;

/// Knobs for the fetcher and synchronizer.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub base_url: String,
    pub user_agent: String,
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub retry_backoff: Duration,
    pub politeness_delay: Duration,
    pub failure_threshold: f64,
    /// Fetches allowed in flight at once. Request starts are still paced
    /// by `politeness_delay` regardless of this value.
    pub concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("iconcache/{}", env!("CARGO_PKG_VERSION")),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_timeout: Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECS),
            retry_backoff: Duration::from_secs(DEFAULT_RETRY_BACKOFF_SECS),
            politeness_delay: Duration::from_millis(DEFAULT_POLITENESS_DELAY_MS),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            concurrency: 1,
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            bail!("max_attempts must be at least 1");
        }
        if self.concurrency == 0 {
            bail!("concurrency must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.failure_threshold) {
            bail!(
                "failure_threshold must be between 0 and 1, got {}",
                self.failure_threshold
            );
        }
        if !self.base_url.contains("{}") {
            bail!("base_url must contain a {{}} placeholder for the asset id");
        }
        Ok(())
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub manifest_path: PathBuf,
    pub cache_dir: PathBuf,
    pub sync: SyncConfig,
}

/// On-disk config file. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    pub manifest_path: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub base_url: Option<String>,
    pub max_attempts: Option<u32>,
    pub concurrency: Option<usize>,
    pub failure_threshold: Option<f64>,
}

impl AppConfig {
    /// Load the user config, or defaults if there is none.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))
            }
            _ => Ok(Self::default()),
        }
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply `ICONCACHE_*` overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ICONCACHE_MANIFEST") {
            self.manifest_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("ICONCACHE_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("ICONCACHE_BASE_URL") {
            self.base_url = Some(v);
        }
        if let Some(v) = lookup("ICONCACHE_MAX_ATTEMPTS") {
            self.max_attempts = Some(v.parse().context("ICONCACHE_MAX_ATTEMPTS is not a number")?);
        }
        if let Some(v) = lookup("ICONCACHE_CONCURRENCY") {
            self.concurrency = Some(v.parse().context("ICONCACHE_CONCURRENCY is not a number")?);
        }
        if let Some(v) = lookup("ICONCACHE_FAILURE_THRESHOLD") {
            self.failure_threshold = Some(
                v.parse()
                    .context("ICONCACHE_FAILURE_THRESHOLD is not a number")?,
            );
        }
        Ok(())
    }

    /// Fill in defaults and validate.
    pub fn resolve(self) -> Result<Settings> {
        let mut sync = SyncConfig::default();
        if let Some(base_url) = self.base_url {
            sync.base_url = base_url;
        }
        if let Some(max_attempts) = self.max_attempts {
            sync.max_attempts = max_attempts;
        }
        if let Some(concurrency) = self.concurrency {
            sync.concurrency = concurrency;
        }
        if let Some(threshold) = self.failure_threshold {
            sync.failure_threshold = threshold;
        }
        sync.validate()?;

        Ok(Settings {
            manifest_path: self
                .manifest_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST_PATH)),
            cache_dir: self
                .cache_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR)),
            sync,
        })
    }
}
