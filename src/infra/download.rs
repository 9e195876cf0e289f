//! HTTP download of dependency archives
//!
//! Streams a dependency archive to disk and records its SHA256 so the
//! build log identifies exactly which bytes went into a nightly. There
//! is deliberately no retry logic: a failed fetch fails its target and
//! the next nightly run starts clean.

use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::FetchError;

/// Result of a completed download
#[derive(Debug)]
pub struct DownloadResult {
    /// Path to the downloaded file
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// SHA256 checksum of the downloaded content
    pub checksum: String,
}

/// HTTP fetcher for dependency archives
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Create a fetcher with sane timeouts for large archives
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .connect_timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Download `url` to `dest`, returning size and checksum
    ///
    /// A partial file is removed on failure so a missing archive is the
    /// only failure signal left on disk.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<DownloadResult, FetchError> {
        let result = self.fetch_inner(url, dest).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        result
    }

    async fn fetch_inner(&self, url: &str, dest: &Path) -> Result<DownloadResult, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                error: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Network {
                url: url.to_string(),
                error: format!("HTTP {}", response.status()),
            });
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::Io {
                    path: parent.to_path_buf(),
                    error: e.to_string(),
                })?;
        }

        let mut file = File::create(dest).await.map_err(|e| FetchError::Io {
            path: dest.to_path_buf(),
            error: e.to_string(),
        })?;

        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| FetchError::Network {
                url: url.to_string(),
                error: e.to_string(),
            })?;

            file.write_all(&chunk).await.map_err(|e| FetchError::Io {
                path: dest.to_path_buf(),
                error: e.to_string(),
            })?;

            hasher.update(&chunk);
            downloaded += chunk.len() as u64;
        }

        file.flush().await.map_err(|e| FetchError::Io {
            path: dest.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(DownloadResult {
            path: dest.to_path_buf(),
            size: downloaded,
            checksum: hex::encode(hasher.finalize()),
        })
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;
        let content = b"dependency archive bytes";

        Mock::given(method("GET"))
            .and(path("/extern.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
            .mount(&mock_server)
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("extern.zip");
        let fetcher = Fetcher::new();

        let result = fetcher
            .fetch(&format!("{}/extern.zip", mock_server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(result.size, content.len() as u64);
        assert_eq!(result.checksum.len(), 64);
        assert_eq!(std::fs::read(&dest).unwrap(), content);
    }

    #[tokio::test]
    async fn test_fetch_http_error_leaves_no_file() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing.tar.gz"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("missing.tar.gz");
        let fetcher = Fetcher::new();

        let result = fetcher
            .fetch(&format!("{}/missing.tar.gz", mock_server.uri()), &dest)
            .await;

        assert!(result.is_err());
        assert!(!dest.exists());
    }
}
