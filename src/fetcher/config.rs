//! # Fetcher Configuration Module
//!
//! Size and time limits for downloads, and where downloaded files land.
//! Uses the same builder pattern as the rest of the crate's configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::settings::{DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_MAX_FILE_SIZE};

/// Configuration for the remote resource fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Largest accepted download in bytes
    pub max_file_size: u64,

    /// Timeout for a whole download in seconds
    pub download_timeout_secs: u64,

    /// Scratch directory downloads are written to
    pub downloads_dir: PathBuf,

    /// User agent to use for requests
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            downloads_dir: PathBuf::from("downloads"),
            user_agent: format!("auto-student/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for FetcherConfig
#[derive(Debug, Default)]
pub struct FetcherConfigBuilder {
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: FetcherConfig::default(),
        }
    }

    /// Set the largest accepted download in bytes
    pub fn max_file_size(mut self, max_file_size: u64) -> Self {
        self.config.max_file_size = max_file_size;
        self
    }

    /// Set the download timeout in seconds
    pub fn download_timeout_secs(mut self, download_timeout_secs: u64) -> Self {
        self.config.download_timeout_secs = download_timeout_secs;
        self
    }

    /// Set the scratch directory
    pub fn downloads_dir(mut self, downloads_dir: impl Into<PathBuf>) -> Self {
        self.config.downloads_dir = downloads_dir.into();
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> FetcherConfig {
        self.config
    }
}

impl FetcherConfig {
    /// Create a new builder
    pub fn builder() -> FetcherConfigBuilder {
        FetcherConfigBuilder::new()
    }

    /// Get the download timeout as a Duration
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}
