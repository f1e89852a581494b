use hyper::StatusCode;
use thiserror::Error;

/// Gateway error types
///
/// Every variant is terminal for the request that produced it. The `Display`
/// text is meant for operator logs; callers only ever see
/// [`GatewayError::public_message`].
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Missing bearer credential")]
    MissingCredential,

    #[error("Invalid bearer credential: {0}")]
    InvalidCredential(#[from] AuthError),

    #[error("Rate limit exceeded for {key}")]
    RateLimited { key: String },

    #[error("Service '{0}' not found")]
    UnknownService(String),

    #[error("Upstream {url} unreachable: {reason}")]
    UpstreamUnreachable { url: String, reason: String },

    #[error("Upstream {url} timed out: {reason}")]
    UpstreamTimeout { url: String, reason: String },

    #[error("Upstream {url} protocol error: {reason}")]
    UpstreamProtocolError { url: String, reason: String },

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP status code mapping for gateway errors
impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::MissingCredential => StatusCode::UNAUTHORIZED,
            GatewayError::InvalidCredential(_) => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::UnknownService(_) => StatusCode::NOT_FOUND,
            GatewayError::UpstreamUnreachable { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamProtocolError { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the caller. Never includes upstream URLs,
    /// transport errors or the reason a credential was refused.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::MissingCredential => "Missing authentication credentials".to_string(),
            GatewayError::InvalidCredential(_) => "Invalid authentication credentials".to_string(),
            GatewayError::RateLimited { .. } => {
                "Too many requests, please retry later".to_string()
            }
            GatewayError::UnknownService(name) => format!("Service '{}' not found", name),
            GatewayError::UpstreamUnreachable { .. } => "Upstream service unavailable".to_string(),
            GatewayError::UpstreamTimeout { .. } => "Upstream service timed out".to_string(),
            GatewayError::UpstreamProtocolError { .. } => {
                "Error forwarding request".to_string()
            }
            GatewayError::InternalError(_) | GatewayError::Config(_) | GatewayError::Io(_) => {
                "Internal server error".to_string()
            }
        }
    }

    /// Whether the response must carry a `WWW-Authenticate` challenge
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            GatewayError::MissingCredential | GatewayError::InvalidCredential(_)
        )
    }
}

/// Reasons a presented credential was refused.
///
/// These stay in logs; externally all of them collapse into
/// [`GatewayError::InvalidCredential`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Signature verification failed")]
    BadSignature,

    #[error("Algorithm mismatch")]
    AlgorithmMismatch,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token not yet valid")]
    NotYetValid,

    #[error("Unexpected issuer or audience")]
    ClaimMismatch,

    #[error("Failed to create verification key")]
    KeyError,
}

/// Configuration specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}
