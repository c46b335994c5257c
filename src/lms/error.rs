//! Error types for the LMS client

use thiserror::Error;

/// Error type for Canvas API calls
#[derive(Debug, Error)]
pub enum LmsError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API token was rejected
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Any other non-success response
    #[error("API error ({status_code}): {message}")]
    Api { status_code: u16, message: String },

    /// The configured base URL cannot be used
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Unexpected response body
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}
