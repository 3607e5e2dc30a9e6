//! Core library for iconcache.
//!
//! Keeps a local, content-addressed mirror of icon assets from the CDN so
//! the client can run offline:
//!
//! - `manifest`: loads the icon manifest and collects asset ids
//! - `ledger`: persisted id -> content hash record of past downloads
//! - `fetch`: single-asset download with retries and request pacing
//! - `sync`: the synchronization run and its statistics
//! - `verify`: read-only coverage audit of the cache directory

pub mod cache;
pub mod config;
pub mod fetch;
pub mod ledger;
pub mod manifest;
pub mod sync;
pub mod utils;
pub mod verify;

#[cfg(test)]
mod test_support;

pub use config::{AppConfig, Settings, SyncConfig};
pub use fetch::{AssetSource, FetchError, Fetcher, HttpSource};
pub use ledger::Ledger;
pub use manifest::{Manifest, ManifestError};
pub use sync::{ExitStatus, RunResult, RunStats, SyncEvent, Synchronizer};
pub use verify::{verify, VerifyReport};
