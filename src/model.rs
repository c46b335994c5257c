//! # LLM Client Module
//!
//! Completion model construction with built-in rate limiting, so a burst of
//! solve requests cannot exhaust the provider's quota.
//!
//! ## Key Components
//!
//! - `Client`: holds the configured completion model
//! - `RateLimitedCompletionModel`: a wrapper that adds rate limiting to any completion model
//!   and reports how long each call was held back
//! - `MockCompletionModel` (tests only): returns canned responses
//!
//! The OpenAI provider is used with a configurable base URL, which also
//! covers OpenAI-compatible servers.

use std::num::NonZeroU32;

use governor::{Quota, RateLimiter};
use ratelimited_completion::RateLimitedCompletionModel;
use rig::{completion::CompletionModel, providers::openai};
use tracing::debug;

use crate::settings::Settings;

#[cfg(test)]
pub mod mock_model;
pub mod ratelimited_completion;

/// Completion requests allowed per minute
const COMPLETIONS_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(500) {
    Some(quota) => quota,
    None => NonZeroU32::MIN,
};

#[derive(Debug, Clone)]
pub struct Client<C>
where
    C: CompletionModel,
{
    completion_model: C,
}

impl Client<RateLimitedCompletionModel<openai::CompletionModel>> {
    /// Client for an OpenAI-compatible endpoint
    pub fn new_openai(api_key: &str, base_url: &str, model_name: &str) -> Self {
        debug!("Using model {} at {}", model_name, base_url);
        let openai_client = openai::Client::from_url(api_key, base_url);
        let completion_limiter = RateLimiter::direct(Quota::per_minute(COMPLETIONS_PER_MINUTE));
        let completion_model = RateLimitedCompletionModel::new(
            openai_client.completion_model(model_name),
            completion_limiter,
        );
        Self { completion_model }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new_openai(
            &settings.openai_api_key,
            &settings.openai_api_base,
            &settings.model_name,
        )
    }
}

impl<C> Client<C>
where
    C: CompletionModel,
{
    pub fn completion(&self) -> &C {
        &self.completion_model
    }
}
