pub mod auth;
pub mod health_checker;
pub mod logging;
pub mod proxy;
pub mod rate_limit;

use async_trait::async_trait;

use crate::core::request::{GatewayRequest, RequestContext};
use crate::core::response::GatewayResponse;
use crate::error::GatewayError;

/// What a stage decided about the request
#[derive(Debug)]
pub enum StageOutcome {
    /// Hand the request to the next stage
    Continue,

    /// Stop here and send this response
    Respond(GatewayResponse),
}

/// One step of the request pipeline
///
/// Stages run in a fixed order. A stage may record facts for later stages in
/// the shared [`RequestContext`], answer the request itself, or fail; an
/// error ends the pipeline and is mapped to a client response.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Process a request
    async fn process(
        &self,
        request: &GatewayRequest,
        context: &mut RequestContext,
    ) -> Result<StageOutcome, GatewayError>;

    /// Get the name of this stage
    fn name(&self) -> &str;
}
