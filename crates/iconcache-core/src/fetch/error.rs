use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Asset not found (404)")]
    NotFound,

    #[error("HTTP error {0}")]
    Status(u16),

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to write {path}: {source}")]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            404 => FetchError::NotFound,
            code => FetchError::Status(code),
        }
    }

    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err.to_string())
        }
    }

    pub fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::LocalIo {
            path: path.into(),
            source,
        }
    }

    /// Whether another attempt could plausibly succeed. A 404 means the
    /// asset does not exist remotely, and local write failures (disk full,
    /// permissions) will not fix themselves between attempts.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Status(_) | FetchError::Timeout | FetchError::Network(_)
        )
    }
}
