//! Shared fixtures for unit tests: a scripted asset source and a tiny
//! HTTP responder bound to localhost.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::config::SyncConfig;
use crate::fetch::{AssetSource, FetchError};

/// Config with no waiting between attempts.
pub fn test_config() -> SyncConfig {
    SyncConfig {
        retry_backoff: Duration::ZERO,
        politeness_delay: Duration::ZERO,
        ..SyncConfig::default()
    }
}

/// Body served for an id with no script (or an exhausted one).
pub fn default_body(id: u64) -> Vec<u8> {
    format!("png-bytes-{}", id).into_bytes()
}

#[derive(Debug, Clone)]
pub enum Reply {
    Body(Vec<u8>),
    NotFound,
    Status(u16),
    Timeout,
    /// Claims success without writing anything.
    Phantom,
}

#[derive(Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<u64, VecDeque<Reply>>>,
    attempts: Mutex<HashMap<u64, u32>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, id: u64, replies: Vec<Reply>) -> Self {
        self.scripts.lock().unwrap().insert(id, replies.into());
        self
    }

    pub fn attempts(&self, id: u64) -> u32 {
        self.attempts.lock().unwrap().get(&id).copied().unwrap_or(0)
    }

    pub fn total_attempts(&self) -> u32 {
        self.attempts.lock().unwrap().values().sum()
    }

    fn next_reply(&self, id: u64) -> Reply {
        *self.attempts.lock().unwrap().entry(id).or_insert(0) += 1;
        self.scripts
            .lock()
            .unwrap()
            .get_mut(&id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Reply::Body(default_body(id)))
    }
}

impl AssetSource for ScriptedSource {
    async fn download(&self, id: u64, dest: &Path, _timeout: Duration) -> Result<u64, FetchError> {
        match self.next_reply(id) {
            Reply::Body(body) => {
                std::fs::write(dest, &body).map_err(|e| FetchError::local_io(dest, e))?;
                Ok(body.len() as u64)
            }
            Reply::NotFound => Err(FetchError::NotFound),
            Reply::Status(code) => Err(FetchError::Status(code)),
            Reply::Timeout => Err(FetchError::Timeout),
            Reply::Phantom => Ok(0),
        }
    }
}

/// Minimal HTTP/1.1 responder. Each connection consumes the next
/// `(status, body)` pair; once the list runs out it answers 404.
pub struct StubServer {
    port: u16,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start(responses: Vec<(u16, Vec<u8>)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        let mut responses: VecDeque<_> = responses.into();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                seen.lock().unwrap().push(String::from_utf8_lossy(&buf).into_owned());

                let (status, body) = responses.pop_front().unwrap_or((404, Vec::new()));
                let head = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(&body).await;
                let _ = stream.shutdown().await;
            }
        });

        Self { port, requests }
    }

    /// URL template pointing at this server.
    pub fn url_template(&self) -> String {
        format!("http://127.0.0.1:{}/{{}}.png", self.port)
    }

    /// Raw request heads received so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}
