//! # Remote Resource Fetcher
//!
//! Downloads a linked resource into the scratch directory with a hard size
//! limit and a timeout. Every failure (network, status, size, filesystem) is
//! logged and reported as `None`; nothing here is retried.
//!
//! ## Key Components
//!
//! - `Fetcher`: owns the HTTP client and performs downloads
//! - `FetcherConfig`: limits and scratch directory, with a builder
//! - `DownloadedArtifact`: a file on disk owned by the caller until removed
//!
//! Video links are never downloaded; they go to the transcript fetcher.

mod config;
mod error;
pub mod filename;

pub use config::{FetcherConfig, FetcherConfigBuilder};
pub use error::FetchError;

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::Client as ReqwestClient;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::extractor::extract_video_id;
use filename::{FALLBACK_NAME, content_disposition_filename, ensure_extension, url_filename};

/// URL schemes that are never fetched
const SKIPPED_SCHEMES: &[&str] = &["data", "mailto", "javascript", "tel"];

/// A downloaded file in the scratch directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    /// URL the file was downloaded from
    pub source_url: String,

    /// Location on disk
    pub path: PathBuf,

    /// Sanitized filename, without the uniqueness prefix
    pub filename: String,

    /// Lower-cased extension, without the dot
    pub extension: String,

    /// `Content-Type` reported by the server, if any
    pub content_type: Option<String>,

    /// Size in bytes; never above the configured maximum
    pub size: u64,
}

impl DownloadedArtifact {
    /// Delete the file. Failures are logged; the scratch directory may be
    /// cleared at any time anyway.
    pub async fn remove(self) {
        if let Err(e) = fs::remove_file(&self.path).await {
            warn!("Failed to remove {}: {}", self.path.display(), e);
        }
    }
}

/// Downloads linked resources under size and time limits
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: ReqwestClient,
    config: FetcherConfig,
}

impl Fetcher {
    /// Create a fetcher with its own HTTP client
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let client = ReqwestClient::builder()
            .timeout(config.download_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    /// Download `url` into the scratch directory
    ///
    /// Returns `None` for video links, non-fetchable schemes, and any
    /// failure. A download that would exceed the size limit leaves no file
    /// behind.
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Option<DownloadedArtifact> {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Skipping unparseable URL {}: {}", url, e);
                return None;
            }
        };

        if SKIPPED_SCHEMES.contains(&parsed.scheme()) {
            debug!("Skipping non-fetchable URL {}", url);
            return None;
        }
        if extract_video_id(url).is_some() {
            debug!("Skipping video URL {}; handled by the transcript fetcher", url);
            return None;
        }

        match self.download(parsed).await {
            Ok(artifact) => {
                info!(
                    "Downloaded {} ({} bytes) to {}",
                    url,
                    artifact.size,
                    artifact.path.display()
                );
                Some(artifact)
            }
            Err(e) => {
                warn!("Failed to download {}: {}", url, e);
                None
            }
        }
    }

    /// Delete every file in the scratch directory, returning how many were removed
    ///
    /// A missing directory counts as already clear.
    #[instrument(skip(self))]
    pub async fn clear_downloads(&self) -> std::io::Result<usize> {
        let dir = &self.config.downloads_dir;
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }
        info!("Removed {} files from {}", removed, dir.display());
        Ok(removed)
    }

    async fn download(&self, url: Url) -> Result<DownloadedArtifact, FetchError> {
        let limit = self.config.max_file_size;
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(length) = response.content_length() {
            if length > limit {
                return Err(FetchError::TooLarge { limit });
            }
        }

        let content_type = header_str(&response, CONTENT_TYPE);
        let name = header_str(&response, CONTENT_DISPOSITION)
            .and_then(|header| content_disposition_filename(&header))
            .or_else(|| url_filename(&url))
            .unwrap_or_else(|| FALLBACK_NAME.to_string());
        let name = ensure_extension(name, content_type.as_deref());

        fs::create_dir_all(&self.config.downloads_dir).await?;
        let path = unique_path(&self.config.downloads_dir, &name);

        let size = match write_body(response, &path, limit).await {
            Ok(size) => size,
            Err(e) => {
                if let Err(remove_err) = fs::remove_file(&path).await {
                    if remove_err.kind() != std::io::ErrorKind::NotFound {
                        warn!("Failed to remove partial file {}: {}", path.display(), remove_err);
                    }
                }
                return Err(e);
            }
        };

        Ok(DownloadedArtifact {
            source_url: url.to_string(),
            path,
            extension: filename::extension(&name).unwrap_or_default(),
            filename: name,
            content_type,
            size,
        })
    }
}

fn header_str(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// `{dir}/{unix-timestamp-nanos}_{name}`
fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let now = chrono::Utc::now();
    let stamp = now
        .timestamp_nanos_opt()
        .map(|nanos| nanos.to_string())
        .unwrap_or_else(|| now.timestamp().to_string());
    dir.join(format!("{}_{}", stamp, name))
}

/// Stream the body to `path`, stopping as soon as more than `limit` bytes arrive
async fn write_body(
    response: reqwest::Response,
    path: &Path,
    limit: u64,
) -> Result<u64, FetchError> {
    let mut file = fs::File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        written += chunk.len() as u64;
        if written > limit {
            return Err(FetchError::TooLarge { limit });
        }
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    Ok(written)
}
