//! HTTP access to the icon CDN.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use futures::StreamExt;
use reqwest::{header, Client};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::FetchError;
use crate::config::SyncConfig;

/// Something that can perform a single download attempt for an asset.
///
/// Implementations write the asset body to `dest` (creating or truncating
/// it) and return the number of bytes written. They must not retry;
/// that is the `Fetcher`'s job.
pub trait AssetSource: Send + Sync {
    fn download(
        &self,
        id: u64,
        dest: &Path,
        timeout: Duration,
    ) -> impl Future<Output = Result<u64, FetchError>> + Send;
}

/// CDN client. Clone is cheap - reqwest::Client shares its connection pool.
#[derive(Clone)]
pub struct HttpSource {
    client: Client,
    url_template: String,
}

impl HttpSource {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("image/png,image/*"));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            url_template: config.base_url.clone(),
        })
    }

    pub fn url_for(&self, id: u64) -> String {
        self.url_template.replace("{}", &id.to_string())
    }
}

impl AssetSource for HttpSource {
    async fn download(&self, id: u64, dest: &Path, timeout: Duration) -> Result<u64, FetchError> {
        let url = self.url_for(id);
        debug!(id, url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| FetchError::local_io(dest, e))?;

        let mut body = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(FetchError::from_transport)?;
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::local_io(dest, e))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| FetchError::local_io(dest, e))?;

        Ok(written)
    }
}
