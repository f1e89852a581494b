use std::sync::Arc;

use hmac::{Hmac, Mac};
use jwt::{VerifyWithKey, VerifyingAlgorithm};
use sha2::{Sha256, Sha384, Sha512};

use crate::config::AuthConfig;
use crate::error::{AuthError, ConfigError};
use crate::middleware::auth::models::{Claims, JwtAlgorithm};
use crate::middleware::auth::TokenValidator;
use crate::utils::{Clock, SystemClock};

/// Verification key matching the configured algorithm
#[derive(Clone)]
enum VerificationKey {
    HS256(Hmac<Sha256>),
    HS384(Hmac<Sha384>),
    HS512(Hmac<Sha512>),
}

impl VerificationKey {
    fn new(algorithm: JwtAlgorithm, secret: &[u8]) -> Result<Self, AuthError> {
        let key = match algorithm {
            JwtAlgorithm::HS256 => {
                Self::HS256(Hmac::new_from_slice(secret).map_err(|_| AuthError::KeyError)?)
            }
            JwtAlgorithm::HS384 => {
                Self::HS384(Hmac::new_from_slice(secret).map_err(|_| AuthError::KeyError)?)
            }
            JwtAlgorithm::HS512 => {
                Self::HS512(Hmac::new_from_slice(secret).map_err(|_| AuthError::KeyError)?)
            }
        };
        Ok(key)
    }

    fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        match self {
            Self::HS256(key) => decode(token, key),
            Self::HS384(key) => decode(token, key),
            Self::HS512(key) => decode(token, key),
        }
    }
}

fn decode<K: VerifyingAlgorithm>(token: &str, key: &K) -> Result<Claims, AuthError> {
    token.verify_with_key(key).map_err(|err| match err {
        jwt::Error::InvalidSignature | jwt::Error::RustCryptoMac(_) => AuthError::BadSignature,
        jwt::Error::AlgorithmMismatch(..) => AuthError::AlgorithmMismatch,
        other => AuthError::Malformed(other.to_string()),
    })
}

/// HMAC-signed JWT validator
pub struct JwtValidator {
    key: VerificationKey,
    algorithm: JwtAlgorithm,
    issuer: Option<String>,
    audience: Option<String>,
    clock: Arc<dyn Clock>,
}

impl JwtValidator {
    /// Create a validator from the authentication configuration
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a validator with an explicit time source
    pub fn with_clock(config: &AuthConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let secret = config
            .secret_key
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::ValidationError("auth.secret_key must be set".to_string()))?;

        let key = VerificationKey::new(config.algorithm, secret.as_bytes()).map_err(|e| {
            ConfigError::ValidationError(format!("cannot build {} key: {}", config.algorithm, e))
        })?;

        Ok(Self {
            key,
            algorithm: config.algorithm,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            clock,
        })
    }

    pub fn algorithm(&self) -> JwtAlgorithm {
        self.algorithm
    }
}

impl TokenValidator for JwtValidator {
    fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.key.verify(token)?;

        let now = self.clock.unix_now().as_secs();
        if claims.is_expired(now) {
            return Err(AuthError::TokenExpired);
        }
        if claims.is_not_valid_yet(now) {
            return Err(AuthError::NotYetValid);
        }

        if let Some(expected) = &self.issuer {
            if claims.iss.as_ref() != Some(expected) {
                return Err(AuthError::ClaimMismatch);
            }
        }
        if let Some(expected) = &self.audience {
            if !claims.aud.iter().any(|aud| aud == expected) {
                return Err(AuthError::ClaimMismatch);
            }
        }

        Ok(claims)
    }
}
