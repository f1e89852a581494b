use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use crate::config::GatewayConfig;
use crate::core::local::LocalHandler;
use crate::core::request::{GatewayRequest, RequestContext};
use crate::core::response::{GatewayResponse, REQUEST_ID};
use crate::core::router::ServiceRouter;
use crate::error::GatewayError;
use crate::middleware::auth::jwt::JwtValidator;
use crate::middleware::auth::AuthStage;
use crate::middleware::health_checker::{HealthChecker, HttpHealthChecker};
use crate::middleware::logging::request_span;
use crate::middleware::proxy::{ProxyForwarder, ProxyStage};
use crate::middleware::rate_limit::{RateLimitStage, SlidingWindowLimiter};
use crate::middleware::{Stage, StageOutcome};
use crate::utils::{duration_to_millis, Clock, SystemClock};

/// Ordered request pipeline
///
/// Stages run in sequence until one responds or fails. Requests that pass
/// every stage are answered by the local handler.
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
    local: LocalHandler,
    limiter: Option<Arc<SlidingWindowLimiter>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Arc<dyn Stage>>, local: LocalHandler) -> Self {
        Self {
            stages,
            local,
            limiter: None,
        }
    }

    /// Build the standard `[rate_limit, auth, proxy]` pipeline
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let health_checker = Arc::new(HttpHealthChecker::new(&config.health)?);
        Self::with_parts(config, Arc::new(SystemClock), health_checker)
    }

    /// Same as [`from_config`](Self::from_config) with an injected clock and
    /// health checker
    pub fn with_parts(
        config: &GatewayConfig,
        clock: Arc<dyn Clock>,
        health_checker: Arc<dyn HealthChecker>,
    ) -> Result<Self, GatewayError> {
        let limiter = Arc::new(SlidingWindowLimiter::from_config(&config.rate_limit, clock.clone()));
        let validator = Arc::new(JwtValidator::with_clock(&config.auth, clock)?);
        let router = Arc::new(ServiceRouter::from_config(config));
        let forwarder = ProxyForwarder::new(&config.proxy)?;

        let stages: Vec<Arc<dyn Stage>> = vec![
            Arc::new(RateLimitStage::new(
                limiter.clone(),
                config.rate_limit.enabled,
                config.rate_limit_exempt_paths(),
            )),
            Arc::new(AuthStage::new(validator, config.auth.whitelist_paths.clone())),
            Arc::new(ProxyStage::new(router.clone(), forwarder)),
        ];
        let local = LocalHandler::new(config.app_name.clone(), router, health_checker);

        tracing::info!(
            stages = ?stages.iter().map(|s| s.name().to_string()).collect::<Vec<_>>(),
            services = config.services.len(),
            "Request pipeline built"
        );

        Ok(Self {
            stages,
            local,
            limiter: config.rate_limit.enabled.then_some(limiter),
        })
    }

    /// Rate limiter backing the rate limiting stage, when enabled
    pub fn limiter(&self) -> Option<&Arc<SlidingWindowLimiter>> {
        self.limiter.as_ref()
    }

    /// Run a request through every stage and produce the client response
    pub async fn process(&self, request: GatewayRequest) -> GatewayResponse {
        let span = request_span(&request);

        async move {
            let started = Instant::now();
            let mut context = RequestContext::default();

            let mut response = match self.run_stages(&request, &mut context).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::debug!(error = %err, "Request ended with error");
                    GatewayResponse::from_error(&err)
                }
            };

            if let Some(decision) = context.rate_limit {
                response = response.with_rate_limit(&decision);
            }
            response.set_header(REQUEST_ID, &request.request_id);

            let elapsed = duration_to_millis(started.elapsed());
            tracing::info!(
                status = response.status.as_u16(),
                backend = response.backend_name.as_deref().unwrap_or("local"),
                elapsed_ms = elapsed,
                "Request completed"
            );
            response.with_processing_time(elapsed)
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        request: &GatewayRequest,
        context: &mut RequestContext,
    ) -> Result<GatewayResponse, GatewayError> {
        for stage in &self.stages {
            match stage.process(request, context).await? {
                StageOutcome::Continue => continue,
                StageOutcome::Respond(response) => {
                    tracing::debug!(stage = stage.name(), "Stage responded");
                    return Ok(response);
                }
            }
        }
        Ok(self.local.handle(request).await)
    }
}
