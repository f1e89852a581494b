pub mod jwt;
pub mod models;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use hyper::header::AUTHORIZATION;

use crate::core::request::{GatewayRequest, RequestContext};
use crate::error::{AuthError, GatewayError};
use crate::middleware::auth::models::Claims;
use crate::middleware::{Stage, StageOutcome};

/// Verifies a presented bearer token and returns its claims
pub trait TokenValidator: Send + Sync {
    fn validate_token(&self, token: &str) -> Result<Claims, AuthError>;
}

/// Authentication stage
///
/// Whitelisted paths and `OPTIONS` requests pass untouched. Everything else
/// needs a valid `Authorization: Bearer <token>` header; the verified claims
/// are stored in the request context for the proxy stage.
pub struct AuthStage {
    validator: Arc<dyn TokenValidator>,
    whitelist: HashSet<String>,
}

impl AuthStage {
    pub fn new(validator: Arc<dyn TokenValidator>, whitelist: impl IntoIterator<Item = String>) -> Self {
        Self {
            validator,
            whitelist: whitelist.into_iter().collect(),
        }
    }

    pub fn is_whitelisted(&self, path: &str) -> bool {
        self.whitelist.contains(path)
    }

    /// Extract the token from the Authorization header. `None` when the
    /// header is absent or uses another scheme.
    fn extract_token(request: &GatewayRequest) -> Option<&str> {
        let header = request.headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = header.split_once(' ')?;
        if scheme.eq_ignore_ascii_case("bearer") {
            Some(token.trim())
        } else {
            None
        }
    }
}

#[async_trait]
impl Stage for AuthStage {
    async fn process(
        &self,
        request: &GatewayRequest,
        context: &mut RequestContext,
    ) -> Result<StageOutcome, GatewayError> {
        if request.is_options() || self.is_whitelisted(request.path()) {
            return Ok(StageOutcome::Continue);
        }

        let token = match Self::extract_token(request) {
            Some(token) => token,
            None => {
                tracing::warn!(path = %request.path(), "Authentication required but no bearer token provided");
                return Err(GatewayError::MissingCredential);
            }
        };

        match self.validator.validate_token(token) {
            Ok(claims) => {
                tracing::debug!(subject = %claims.sub, "Authenticated request");
                context.claims = Some(claims);
                Ok(StageOutcome::Continue)
            }
            Err(err) => {
                tracing::warn!(path = %request.path(), "Token validation failed: {}", err);
                Err(GatewayError::InvalidCredential(err))
            }
        }
    }

    fn name(&self) -> &str {
        "auth"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use hyper::{HeaderMap, Method, Uri};

    struct FixedValidator;

    impl TokenValidator for FixedValidator {
        fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
            match token {
                "good" => Ok(Claims::new("42", u64::MAX)),
                "expired" => Err(AuthError::TokenExpired),
                _ => Err(AuthError::BadSignature),
            }
        }
    }

    fn stage() -> AuthStage {
        AuthStage::new(
            Arc::new(FixedValidator),
            vec!["/health".to_string(), "/api/auth/login".to_string()],
        )
    }

    fn request(method: Method, path: &'static str, authorization: Option<&'static str>) -> GatewayRequest {
        let mut headers = HeaderMap::new();
        if let Some(value) = authorization {
            headers.insert(AUTHORIZATION, value.parse().unwrap());
        }
        GatewayRequest::new(method, Uri::from_static(path), headers, Bytes::new(), None)
    }

    #[tokio::test]
    async fn test_valid_token_sets_claims() {
        let mut context = RequestContext::default();
        let outcome = stage()
            .process(&request(Method::GET, "/api/user/profile", Some("Bearer good")), &mut context)
            .await
            .unwrap();

        assert!(matches!(outcome, StageOutcome::Continue));
        assert_eq!(context.claims.unwrap().sub, "42");
    }

    #[tokio::test]
    async fn test_scheme_is_case_insensitive() {
        let mut context = RequestContext::default();
        let outcome = stage()
            .process(&request(Method::GET, "/x", Some("bearer good")), &mut context)
            .await
            .unwrap();
        assert!(matches!(outcome, StageOutcome::Continue));
    }

    #[tokio::test]
    async fn test_missing_token() {
        let mut context = RequestContext::default();
        let err = stage()
            .process(&request(Method::GET, "/api/user/profile", None), &mut context)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredential));

        let err = stage()
            .process(&request(Method::GET, "/api/user/profile", Some("Basic dXNlcjpwYXNz")), &mut context)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MissingCredential));
    }

    #[tokio::test]
    async fn test_invalid_token() {
        let mut context = RequestContext::default();
        let err = stage()
            .process(&request(Method::GET, "/api/user/profile", Some("Bearer expired")), &mut context)
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::InvalidCredential(AuthError::TokenExpired)));
        assert!(context.claims.is_none());
    }

    #[tokio::test]
    async fn test_whitelist_and_options_bypass() {
        let mut context = RequestContext::default();
        let outcome = stage()
            .process(&request(Method::GET, "/health", Some("Bearer forged")), &mut context)
            .await
            .unwrap();
        assert!(matches!(outcome, StageOutcome::Continue));

        let outcome = stage()
            .process(&request(Method::OPTIONS, "/api/user/profile", None), &mut context)
            .await
            .unwrap();
        assert!(matches!(outcome, StageOutcome::Continue));
        assert!(context.claims.is_none());
    }
}
