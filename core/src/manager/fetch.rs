//! Archive transport.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::config::DownloadConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("download cancelled")]
    Cancelled,
    #[error("{0}")]
    Failed(String),
}

/// Callback receiving `(bytes_received, bytes_total)` as data arrives.
pub type FetchProgress<'a> = dyn FnMut(u64, Option<u64>) + 'a;

/// Retrieves an emulator archive into a local file.
///
/// Implementations may retry internally; `dest` is rewound on each attempt so
/// callers only ever see a complete download or an error.
pub trait ArchiveFetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        dest: &mut File,
        cancel: &CancelToken,
        progress: &mut FetchProgress<'_>,
    ) -> Result<u64, FetchError>;
}

/// HTTP(S) transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
    retries: u32,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::from_config(&DownloadConfig::default())
    }
}

/// Outcome of one request attempt.
enum AttemptError {
    Retryable(String),
    Fatal(FetchError),
}

impl HttpFetcher {
    pub fn new(timeout: Duration, retries: u32) -> Self {
        Self { timeout, retries }
    }

    pub fn from_config(config: &DownloadConfig) -> Self {
        Self::new(config.timeout(), config.retries)
    }

    async fn fetch_once(
        &self,
        client: &reqwest::Client,
        url: &str,
        dest: &mut File,
        cancel: &CancelToken,
        progress: &mut FetchProgress<'_>,
    ) -> Result<u64, AttemptError> {
        let mut response = client
            .get(url)
            .send()
            .await
            .map_err(|e| AttemptError::Retryable(format!("request failed: {e}")))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AttemptError::Retryable(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(AttemptError::Fatal(FetchError::Failed(format!(
                "HTTP {status}"
            ))));
        }

        let total = response.content_length();
        let mut received = 0u64;
        progress(0, total);

        loop {
            if cancel.is_cancelled() {
                return Err(AttemptError::Fatal(FetchError::Cancelled));
            }
            let chunk = response
                .chunk()
                .await
                .map_err(|e| AttemptError::Retryable(format!("read failed: {e}")))?;
            let Some(chunk) = chunk else {
                break;
            };
            dest.write_all(&chunk).map_err(|e| {
                AttemptError::Fatal(FetchError::Failed(format!("write failed: {e}")))
            })?;
            received += chunk.len() as u64;
            progress(received, total);
        }

        dest.flush()
            .map_err(|e| AttemptError::Fatal(FetchError::Failed(format!("write failed: {e}"))))?;
        Ok(received)
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(
        &self,
        url: &str,
        dest: &mut File,
        cancel: &CancelToken,
        progress: &mut FetchProgress<'_>,
    ) -> Result<u64, FetchError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| FetchError::Failed(format!("failed to create runtime: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("emuforge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Failed(format!("failed to create HTTP client: {e}")))?;

        rt.block_on(async {
            let mut attempt = 0u32;
            loop {
                dest.set_len(0)
                    .and_then(|_| dest.seek(SeekFrom::Start(0)))
                    .map_err(|e| FetchError::Failed(format!("failed to reset download: {e}")))?;

                match self.fetch_once(&client, url, dest, cancel, progress).await {
                    Ok(n) => return Ok(n),
                    Err(AttemptError::Fatal(e)) => return Err(e),
                    Err(AttemptError::Retryable(reason)) if attempt < self.retries => {
                        attempt += 1;
                        tracing::warn!(
                            "Download of {} failed ({}), retrying ({}/{})",
                            url,
                            reason,
                            attempt,
                            self.retries
                        );
                        tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                        if cancel.is_cancelled() {
                            return Err(FetchError::Cancelled);
                        }
                    }
                    Err(AttemptError::Retryable(reason)) => return Err(FetchError::Failed(reason)),
                }
            }
        })
    }
}
