pub mod limiter;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::request::{GatewayRequest, RequestContext};
use crate::error::GatewayError;
use crate::middleware::{Stage, StageOutcome};

pub use limiter::SlidingWindowLimiter;

/// Outcome of one admission attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the request was admitted
    pub allowed: bool,

    /// Maximum requests per window
    pub limit: u32,

    /// Slots left in the window at admission time
    pub remaining: u32,

    /// Unix second at which the oldest admission in the window expires
    pub reset: u64,
}

/// Rate limiting stage
///
/// Runs first in the pipeline. The decision is kept in the request context
/// so the orchestrator can report it on the final response; the remaining
/// count is the admission-time value and is not refreshed afterwards.
pub struct RateLimitStage {
    limiter: Arc<SlidingWindowLimiter>,
    enabled: bool,
    exempt_paths: HashSet<String>,
}

impl RateLimitStage {
    pub fn new(
        limiter: Arc<SlidingWindowLimiter>,
        enabled: bool,
        exempt_paths: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            limiter,
            enabled,
            exempt_paths: exempt_paths.into_iter().collect(),
        }
    }

    pub fn limiter(&self) -> &Arc<SlidingWindowLimiter> {
        &self.limiter
    }

    fn is_exempt(&self, request: &GatewayRequest) -> bool {
        !self.enabled || request.is_options() || self.exempt_paths.contains(request.path())
    }
}

#[async_trait]
impl Stage for RateLimitStage {
    async fn process(
        &self,
        request: &GatewayRequest,
        context: &mut RequestContext,
    ) -> Result<StageOutcome, GatewayError> {
        if self.is_exempt(request) {
            return Ok(StageOutcome::Continue);
        }

        let key = request.client_key();
        let decision = self.limiter.admit(&key);
        context.rate_limit = Some(decision);

        if decision.allowed {
            tracing::debug!(client = %key, remaining = decision.remaining, "Request admitted");
            Ok(StageOutcome::Continue)
        } else {
            tracing::warn!(client = %key, limit = decision.limit, "Request rate limited");
            Err(GatewayError::RateLimited { key })
        }
    }

    fn name(&self) -> &str {
        "rate_limit"
    }
}
