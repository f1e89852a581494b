use std::net::IpAddr;
use std::time::SystemTime;

use bytes::Bytes;
use hyper::{HeaderMap, Method, Uri};

use crate::middleware::auth::models::Claims;
use crate::middleware::rate_limit::RateDecision;
use crate::utils::generate_request_id;

/// Represents a request to the API Gateway
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    /// HTTP method
    pub method: Method,

    /// Request URI (path and query)
    pub uri: Uri,

    /// HTTP headers
    pub headers: HeaderMap,

    /// Request body
    pub body: Bytes,

    /// Client IP address
    pub client_ip: Option<IpAddr>,

    /// Request timestamp
    pub timestamp: SystemTime,

    /// Request ID for tracing
    pub request_id: String,
}

impl GatewayRequest {
    /// Create a new GatewayRequest
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
        client_ip: Option<IpAddr>,
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            client_ip,
            timestamp: SystemTime::now(),
            request_id: generate_request_id(),
        }
    }

    /// Request path without the query string
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Get a header value as a string
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }

    /// Identity used for rate accounting
    pub fn client_key(&self) -> String {
        match self.client_ip {
            Some(ip) => format!("ip:{}", ip),
            None => "ip:unknown".to_string(),
        }
    }

    /// CORS preflight and other `OPTIONS` requests skip rate limiting and
    /// authentication
    pub fn is_options(&self) -> bool {
        self.method == Method::OPTIONS
    }
}

/// Per-request state shared between pipeline stages
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Verified credential claims, set by the authentication stage
    pub claims: Option<Claims>,

    /// Admission decision, set by the rate limiting stage
    pub rate_limit: Option<RateDecision>,
}
