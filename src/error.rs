//! Error types for the auto_student crate

use thiserror::Error;

use crate::fetcher::FetchError;
use crate::lms::LmsError;
use crate::settings::ConfigError;

/// Result type for auto_student operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for auto_student operations
///
/// Only configuration and connectivity failures surface here. Failures of a
/// single download or transcript are recovered where they happen and turned
/// into placeholder text.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed settings
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The learning-management system could not be reached or rejected the request
    #[error("LMS error: {0}")]
    Lms(#[from] LmsError),

    /// The download client could not be built
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// The completion model could not be reached or returned an error
    #[error("Completion error: {0}")]
    Completion(String),
}
