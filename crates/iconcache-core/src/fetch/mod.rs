//! Remote asset retrieval.
//!
//! `HttpSource` performs single GET attempts against the CDN;
//! `Fetcher` wraps any `AssetSource` with bounded retries and a shared
//! `Pacer` that spaces request starts to keep the CDN happy.

pub mod client;
pub mod error;
pub mod fetcher;

pub use client::{AssetSource, HttpSource};
pub use error::FetchError;
pub use fetcher::{Fetcher, Pacer};
