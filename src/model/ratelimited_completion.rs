use std::sync::Arc;
use std::time::{Duration, Instant};

use governor::DefaultDirectRateLimiter;
use rig::completion::{CompletionError, CompletionModel, CompletionRequest, CompletionResponse};
use tracing::{Instrument, debug, debug_span, info_span};

/// Raw provider response plus the time spent waiting on the limiter
#[derive(Debug, Clone)]
pub struct Throttled<T> {
    pub response: T,
    pub waited: Duration,
}

/// Waits on a shared rate limiter before every completion call
///
/// Clones share one limiter, so every solver built from the same client
/// draws from the same quota.
#[derive(Clone)]
pub struct RateLimitedCompletionModel<M: CompletionModel> {
    model: M,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl<M: CompletionModel + std::fmt::Debug> std::fmt::Debug for RateLimitedCompletionModel<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedCompletionModel")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl<M> RateLimitedCompletionModel<M>
where
    M: CompletionModel,
{
    pub fn new(model: M, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            model,
            limiter: Arc::new(limiter),
        }
    }
}

impl<M: CompletionModel> CompletionModel for RateLimitedCompletionModel<M> {
    type Response = Throttled<M::Response>;

    async fn completion(
        &self,
        completion_request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        let started = Instant::now();
        self.limiter.until_ready().instrument(debug_span!("limiter")).await;
        let waited = started.elapsed();
        if !waited.is_zero() {
            debug!("Completion held back {:?} by the rate limiter", waited);
        }

        let CompletionResponse {
            choice,
            raw_response,
        } = self
            .model
            .completion(completion_request)
            .instrument(info_span!("completion"))
            .await?;

        Ok(CompletionResponse {
            choice,
            raw_response: Throttled {
                response: raw_response,
                waited,
            },
        })
    }
}
