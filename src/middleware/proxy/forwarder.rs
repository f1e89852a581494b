use std::time::Instant;

use reqwest::{redirect, Client};

use crate::config::ProxyConfig;
use crate::core::request::GatewayRequest;
use crate::core::response::GatewayResponse;
use crate::error::GatewayError;
use crate::middleware::auth::models::Claims;
use crate::middleware::proxy::headers::{outbound_request_headers, relayed_response_headers, IdentityHeaders};
use crate::models::BackendTarget;
use crate::utils::duration_to_millis;

/// Relays requests to backend services over a shared connection pool
#[derive(Clone)]
pub struct ProxyForwarder {
    client: Client,
    identity: IdentityHeaders,
}

impl ProxyForwarder {
    pub fn new(config: &ProxyConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| GatewayError::InternalError(format!("Failed to build HTTP client: {}", e)))?;

        let identity = IdentityHeaders::new(&config.identity_header, &config.scopes_header)
            .map_err(|e| GatewayError::InternalError(format!("Invalid identity header name: {}", e)))?;

        Ok(Self { client, identity })
    }

    /// Forward `request` to `target` and relay the backend's answer
    ///
    /// Any backend status, 4xx and 5xx included, is relayed as-is. Only
    /// transport failures become gateway errors.
    pub async fn forward(
        &self,
        request: &GatewayRequest,
        target: &BackendTarget,
        claims: Option<&Claims>,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = target.url(request.uri.query());
        let headers = outbound_request_headers(&request.headers, &self.identity, claims);
        let started = Instant::now();

        tracing::info!(service = %target.service, method = %request.method, %url, "Forwarding request");

        let upstream = self
            .client
            .request(request.method.clone(), &url)
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| classify_error(&url, e))?;

        let status = upstream.status();
        let headers = relayed_response_headers(upstream.headers());
        let body = upstream.bytes().await.map_err(|e| classify_error(&url, e))?;
        let elapsed = duration_to_millis(started.elapsed());

        tracing::debug!(
            service = %target.service,
            status = status.as_u16(),
            elapsed_ms = elapsed,
            "Backend responded"
        );

        Ok(GatewayResponse::new(status, headers, body)
            .with_backend_name(target.service.clone())
            .with_processing_time(elapsed))
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> GatewayError {
    let reason = error.to_string();
    tracing::error!(%url, "Error forwarding request: {}", reason);

    if error.is_timeout() {
        GatewayError::UpstreamTimeout {
            url: url.to_string(),
            reason,
        }
    } else if error.is_connect() {
        GatewayError::UpstreamUnreachable {
            url: url.to_string(),
            reason,
        }
    } else if error.is_builder() {
        GatewayError::InternalError(reason)
    } else {
        GatewayError::UpstreamProtocolError {
            url: url.to_string(),
            reason,
        }
    }
}
