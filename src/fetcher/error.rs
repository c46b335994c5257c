//! Error types for the fetcher module
//!
//! These never leave the fetcher: [`Fetcher::fetch`](super::Fetcher::fetch)
//! logs them and returns `None`.

use thiserror::Error;

/// Error type for a single download
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a status of 400 or above
    #[error("HTTP status {0}")]
    Status(u16),

    /// The body is larger than the configured limit
    #[error("download exceeds {limit} bytes")]
    TooLarge {
        /// Configured maximum in bytes
        limit: u64,
    },

    /// Filesystem error while writing the download
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
