use hyper::header::{HeaderName, HeaderValue, CONNECTION, CONTENT_LENGTH, HOST};
use hyper::HeaderMap;
use tracing::warn;

use crate::middleware::auth::models::Claims;

const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any listed in `Connection`
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().to_lowercase().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

/// Identity headers injected from verified claims
#[derive(Debug, Clone)]
pub struct IdentityHeaders {
    identity: HeaderName,
    scopes: HeaderName,
}

impl IdentityHeaders {
    pub fn new(identity: &str, scopes: &str) -> Result<Self, hyper::http::Error> {
        Ok(Self {
            identity: HeaderName::from_bytes(identity.to_lowercase().as_bytes())?,
            scopes: HeaderName::from_bytes(scopes.to_lowercase().as_bytes())?,
        })
    }

    /// Drop client-supplied copies so they can never reach a backend
    pub fn strip(&self, headers: &mut HeaderMap) {
        headers.remove(&self.identity);
        headers.remove(&self.scopes);
    }

    /// Set the identity headers from verified claims
    ///
    /// A claim that cannot be carried in a header value is left out and logged.
    pub fn inject(&self, headers: &mut HeaderMap, claims: &Claims) {
        match HeaderValue::from_str(&claims.sub) {
            Ok(value) => {
                headers.insert(self.identity.clone(), value);
            }
            Err(_) => warn!(
                header = %self.identity,
                "Token subject is not a valid header value, identity header omitted"
            ),
        }

        if let Some(scopes) = claims.scopes_header_value() {
            match HeaderValue::from_str(&scopes) {
                Ok(value) => {
                    headers.insert(self.scopes.clone(), value);
                }
                Err(_) => warn!(
                    header = %self.scopes,
                    "Token scopes are not a valid header value, scopes header omitted"
                ),
            }
        }
    }
}

impl Default for IdentityHeaders {
    fn default() -> Self {
        Self {
            identity: HeaderName::from_static("x-user-id"),
            scopes: HeaderName::from_static("x-user-scopes"),
        }
    }
}

/// Headers to send downstream for one request
pub fn outbound_request_headers(
    inbound: &HeaderMap,
    identity: &IdentityHeaders,
    claims: Option<&Claims>,
) -> HeaderMap {
    let mut headers = inbound.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(HOST);
    headers.remove(CONTENT_LENGTH);
    identity.strip(&mut headers);

    if let Some(claims) = claims {
        identity.inject(&mut headers, claims);
    }
    headers
}

/// Headers to relay back to the client from a backend response
pub fn relayed_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = upstream.clone();
    strip_hop_by_hop(&mut headers);
    // The body is re-framed by the gateway
    headers.remove(CONTENT_LENGTH);
    headers
}
