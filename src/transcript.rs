//! # Transcript Fetcher
//!
//! Turns a video id into transcript text for the prompt. The actual caption
//! lookup is a synchronous [`TranscriptProvider`], run on the blocking pool
//! so it never stalls the async workers.
//!
//! Failures never propagate: each known failure category becomes its own
//! placeholder and anything else becomes a generic error placeholder.

mod error;
pub mod youtube;

pub use error::TranscriptError;
pub use youtube::YouTubeTranscriptProvider;

use std::sync::Arc;

use tokio::task;
use tracing::{info, instrument, warn};

/// One timed caption line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptFragment {
    pub text: String,
    /// Seconds from the start of the video
    pub start: f64,
    /// Seconds
    pub duration: f64,
}

/// A synchronous source of captions
pub trait TranscriptProvider: Send + Sync {
    fn fetch(&self, video_id: &str) -> Result<Vec<TranscriptFragment>, TranscriptError>;
}

/// Async front for a [`TranscriptProvider`]
#[derive(Clone)]
pub struct TranscriptFetcher {
    provider: Arc<dyn TranscriptProvider>,
}

impl std::fmt::Debug for TranscriptFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptFetcher").finish_non_exhaustive()
    }
}

impl TranscriptFetcher {
    pub fn new(provider: Arc<dyn TranscriptProvider>) -> Self {
        Self { provider }
    }

    /// Fetcher backed by YouTube, preferring `languages` in order
    pub fn youtube(languages: Vec<String>) -> Self {
        Self::new(Arc::new(YouTubeTranscriptProvider::new(languages)))
    }

    /// Transcript text for `video_id`, or a placeholder describing why there is none
    #[instrument(skip(self))]
    pub async fn transcript(&self, video_id: &str) -> String {
        let provider = Arc::clone(&self.provider);
        let id = video_id.to_string();

        // Provider is synchronous
        let result = task::spawn_blocking(move || provider.fetch(&id)).await;

        match result {
            Ok(Ok(fragments)) => {
                info!("Fetched {} transcript fragments for {}", fragments.len(), video_id);
                join_fragments(&fragments)
            }
            Ok(Err(e)) => {
                warn!("Transcript unavailable for {}: {}", video_id, e);
                placeholder(video_id, &e)
            }
            Err(e) => {
                warn!("Transcript worker failed for {}: {}", video_id, e);
                format!("[Error fetching transcript for video {}: {}]", video_id, e)
            }
        }
    }
}

/// Fragment texts joined by single spaces
pub fn join_fragments(fragments: &[TranscriptFragment]) -> String {
    fragments
        .iter()
        .map(|fragment| fragment.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Placeholder text for a failed lookup
pub fn placeholder(video_id: &str, error: &TranscriptError) -> String {
    match error {
        TranscriptError::TranscriptsDisabled(_) => {
            format!("[Transcripts are disabled for video {}]", video_id)
        }
        TranscriptError::NoTranscriptFound(_) => {
            format!("[No transcript found for video {}]", video_id)
        }
        TranscriptError::VideoUnavailable(_) => format!("[Video {} is unavailable]", video_id),
        other => format!("[Error fetching transcript for video {}: {}]", video_id, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubProvider;

    impl TranscriptProvider for StubProvider {
        fn fetch(&self, video_id: &str) -> Result<Vec<TranscriptFragment>, TranscriptError> {
            let id = video_id.to_string();
            match video_id {
                "disabled000" => Err(TranscriptError::TranscriptsDisabled(id)),
                "notfound000" => Err(TranscriptError::NoTranscriptFound(id)),
                "gone0000000" => Err(TranscriptError::VideoUnavailable(id)),
                "broken00000" => Err(TranscriptError::Other("boom".to_string())),
                "panics00000" => panic!("provider crashed"),
                _ => Ok(vec![
                    TranscriptFragment {
                        text: "first line".to_string(),
                        start: 0.0,
                        duration: 1.0,
                    },
                    TranscriptFragment {
                        text: "second line".to_string(),
                        start: 1.0,
                        duration: 1.0,
                    },
                ]),
            }
        }
    }

    fn fetcher() -> TranscriptFetcher {
        TranscriptFetcher::new(Arc::new(StubProvider))
    }

    #[tokio::test]
    async fn test_transcript_joins_fragments() {
        assert_eq!(fetcher().transcript("dQw4w9WgXcQ").await, "first line second line");
    }

    #[tokio::test]
    async fn test_failure_categories_have_distinct_placeholders() {
        let fetcher = fetcher();
        let disabled = fetcher.transcript("disabled000").await;
        let not_found = fetcher.transcript("notfound000").await;
        let gone = fetcher.transcript("gone0000000").await;
        let broken = fetcher.transcript("broken00000").await;

        assert_eq!(disabled, "[Transcripts are disabled for video disabled000]");
        assert_eq!(not_found, "[No transcript found for video notfound000]");
        assert_eq!(gone, "[Video gone0000000 is unavailable]");
        assert_eq!(broken, "[Error fetching transcript for video broken00000: boom]");
    }

    #[tokio::test]
    async fn test_panicking_provider_becomes_placeholder() {
        let text = fetcher().transcript("panics00000").await;
        assert!(text.starts_with("[Error fetching transcript for video panics00000:"));
    }
}
