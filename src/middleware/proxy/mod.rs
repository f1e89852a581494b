pub mod forwarder;
pub mod headers;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::request::{GatewayRequest, RequestContext};
use crate::core::router::{RouteDecision, ServiceRouter};
use crate::error::GatewayError;
use crate::middleware::{Stage, StageOutcome};

pub use forwarder::ProxyForwarder;

/// Routing and forwarding stage
///
/// Proxy paths are answered by the backend. Everything else continues to the
/// local handler.
pub struct ProxyStage {
    router: Arc<ServiceRouter>,
    forwarder: ProxyForwarder,
}

impl ProxyStage {
    pub fn new(router: Arc<ServiceRouter>, forwarder: ProxyForwarder) -> Self {
        Self { router, forwarder }
    }
}

#[async_trait]
impl Stage for ProxyStage {
    async fn process(
        &self,
        request: &GatewayRequest,
        context: &mut RequestContext,
    ) -> Result<StageOutcome, GatewayError> {
        match self.router.resolve(request.path()) {
            RouteDecision::Local => Ok(StageOutcome::Continue),
            RouteDecision::UnknownService(service) => {
                tracing::warn!(%service, path = %request.path(), "Request for unknown service");
                Err(GatewayError::UnknownService(service))
            }
            RouteDecision::Proxy(target) => {
                let response = self
                    .forwarder
                    .forward(request, &target, context.claims.as_ref())
                    .await?;
                Ok(StageOutcome::Respond(response))
            }
        }
    }

    fn name(&self) -> &str {
        "proxy"
    }
}
