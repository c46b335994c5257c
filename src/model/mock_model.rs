//! # Mock Completion Model for Testing
//!
//! Provides a `MockCompletionModel` that implements the `CompletionModel` trait
//! for use in tests. It returns a predefined response, or fails like an
//! unreachable provider, without making actual API calls.

use rig::{
    completion::{
        AssistantContent, CompletionError, CompletionModel, CompletionRequest, CompletionResponse,
    },
    one_or_many::OneOrMany,
};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
enum MockBehaviour {
    Respond(String),
    Fail(String),
}

/// A mock completion model for testing purposes.
#[derive(Debug, Clone)]
pub struct MockCompletionModel {
    behaviour: Arc<Mutex<Option<MockBehaviour>>>,
    calls: Arc<Mutex<usize>>,
}

impl MockCompletionModel {
    /// Creates a new mock model that will return a default empty success response.
    pub fn new() -> Self {
        Self {
            behaviour: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Answer every call with `text`, which is also the raw response.
    pub async fn set_text_response(&self, text: &str) {
        *self.behaviour.lock().await = Some(MockBehaviour::Respond(text.to_string()));
    }

    /// Make every call fail with a provider error.
    pub async fn set_error(&self, message: &str) {
        *self.behaviour.lock().await = Some(MockBehaviour::Fail(message.to_string()));
    }

    /// Number of completion calls made so far.
    pub async fn calls(&self) -> usize {
        *self.calls.lock().await
    }
}

impl Default for MockCompletionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionModel for MockCompletionModel {
    type Response = String;

    async fn completion(
        &self,
        _completion_request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        *self.calls.lock().await += 1;
        let behaviour = self.behaviour.lock().await.clone();
        match behaviour {
            Some(MockBehaviour::Respond(text)) => Ok(CompletionResponse {
                choice: OneOrMany::one(AssistantContent::text(&text)),
                raw_response: text,
            }),
            Some(MockBehaviour::Fail(message)) => Err(CompletionError::ProviderError(message)),
            None => Ok(CompletionResponse {
                choice: OneOrMany::one(AssistantContent::text("")),
                raw_response: "".to_string(),
            }),
        }
    }
}
