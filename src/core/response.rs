use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE, WWW_AUTHENTICATE};
use hyper::{HeaderMap, StatusCode};

use crate::error::GatewayError;
use crate::middleware::rate_limit::RateDecision;

pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
pub const REQUEST_ID: &str = "x-request-id";

/// Represents a response from the API Gateway
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    /// HTTP status code
    pub status: StatusCode,

    /// HTTP headers
    pub headers: HeaderMap,

    /// Response body
    pub body: Bytes,

    /// Backend service that processed the request (if applicable)
    pub backend_name: Option<String>,

    /// Time taken to process the request in milliseconds
    pub processing_time_ms: u64,
}

impl GatewayResponse {
    /// Create a new GatewayResponse
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            backend_name: None,
            processing_time_ms: 0,
        }
    }

    /// JSON response from a serializable value
    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self::new(status, headers, Bytes::from(value.to_string()))
    }

    /// Create a new error response
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }

    /// Response for a terminal gateway error. Only the public message is
    /// exposed; authentication failures carry a bearer challenge.
    pub fn from_error(error: &GatewayError) -> Self {
        let mut response = Self::error(error.status_code(), &error.public_message());
        if error.is_auth_failure() {
            response
                .headers
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }

    /// Attach the three rate-limit headers
    pub fn with_rate_limit(mut self, decision: &RateDecision) -> Self {
        self.set_header(RATE_LIMIT_LIMIT, &decision.limit.to_string());
        self.set_header(RATE_LIMIT_REMAINING, &decision.remaining.to_string());
        self.set_header(RATE_LIMIT_RESET, &decision.reset.to_string());
        self
    }

    /// Set backend name for this response
    pub fn with_backend_name(mut self, backend_name: String) -> Self {
        self.backend_name = Some(backend_name);
        self
    }

    /// Set processing time for this response
    pub fn with_processing_time(mut self, processing_time_ms: u64) -> Self {
        self.processing_time_ms = processing_time_ms;
        self
    }

    /// Insert a header, replacing any existing value. Invalid values are
    /// dropped.
    pub fn set_header(&mut self, name: &'static str, value: &str) {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(HeaderName::from_static(name), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;

    #[test]
    fn test_gateway_response_error() {
        let response = GatewayResponse::error(StatusCode::BAD_REQUEST, "Invalid \"input\"");

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.headers.get("content-type").unwrap(), "application/json");

        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["error"], "Invalid \"input\"");
    }

    #[test]
    fn test_from_auth_error_has_challenge() {
        let response =
            GatewayResponse::from_error(&GatewayError::InvalidCredential(AuthError::BadSignature));
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers.get(WWW_AUTHENTICATE).unwrap(), "Bearer");

        let response = GatewayResponse::from_error(&GatewayError::UnknownService("x".into()));
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(response.headers.get(WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn test_with_rate_limit_headers() {
        let decision = RateDecision {
            allowed: true,
            limit: 20,
            remaining: 7,
            reset: 1_700_000_060,
        };
        let response = GatewayResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::new())
            .with_rate_limit(&decision);

        assert_eq!(response.headers.get("X-RateLimit-Limit").unwrap(), "20");
        assert_eq!(response.headers.get("X-RateLimit-Remaining").unwrap(), "7");
        assert_eq!(response.headers.get("X-RateLimit-Reset").unwrap(), "1700000060");
    }

    #[test]
    fn test_builders() {
        let response = GatewayResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from("data"))
            .with_backend_name("user".to_string())
            .with_processing_time(150);

        assert_eq!(response.backend_name.as_deref(), Some("user"));
        assert_eq!(response.processing_time_ms, 150);
    }
}
