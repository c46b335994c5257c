//! Error types for transcript providers

use thiserror::Error;

/// Why a transcript could not be produced
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// The video owner disabled captions
    #[error("transcripts are disabled for video {0}")]
    TranscriptsDisabled(String),

    /// Captions exist but none in an accepted language, or none at all
    #[error("no transcript found for video {0}")]
    NoTranscriptFound(String),

    /// The video is private, removed or otherwise unplayable
    #[error("video {0} is unavailable")]
    VideoUnavailable(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The caption data could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for TranscriptError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<quick_xml::Error> for TranscriptError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
