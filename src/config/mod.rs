pub mod cli;

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::middleware::auth::models::JwtAlgorithm;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Use the first `X-Forwarded-For` entry as the client address
    pub trust_forwarded_for: bool,

    /// Largest accepted request body, in bytes
    pub max_body_bytes: usize,

    /// How long `stop` waits for open connections before aborting them
    pub shutdown_grace_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            trust_forwarded_for: false,
            max_body_bytes: 2 * 1024 * 1024,
            shutdown_grace_seconds: 10,
        }
    }
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HMAC signing secret
    pub secret_key: Option<String>,

    /// Declared token algorithm
    pub algorithm: JwtAlgorithm,

    /// Expected issuer, checked only when set
    pub issuer: Option<String>,

    /// Expected audience, checked only when set
    pub audience: Option<String>,

    /// Paths that never require a credential
    pub whitelist_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            algorithm: JwtAlgorithm::HS256,
            issuer: None,
            audience: None,
            whitelist_paths: vec![
                "/".to_string(),
                "/health".to_string(),
                "/docs".to_string(),
                "/redoc".to_string(),
                "/openapi.json".to_string(),
                "/api/auth/login".to_string(),
            ],
        }
    }
}

/// Proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// First path segment marking a proxied request (`/<prefix>/<service>/...`)
    pub prefix: String,

    /// Service names handled by the gateway itself
    pub local_services: Vec<String>,

    /// Outbound connect timeout in seconds
    pub connect_timeout_seconds: u64,

    /// Outbound overall timeout in seconds
    pub timeout_seconds: u64,

    /// Maximum number of redirects followed per call
    pub max_redirects: usize,

    /// Header carrying the authenticated subject to backends
    pub identity_header: String,

    /// Header carrying the authenticated scopes to backends
    pub scopes_header: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            prefix: "api".to_string(),
            local_services: vec!["auth".to_string()],
            connect_timeout_seconds: 5,
            timeout_seconds: 30,
            max_redirects: 10,
            identity_header: "X-User-ID".to_string(),
            scopes_header: "X-User-Scopes".to_string(),
        }
    }
}

impl ProxyConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled
    pub enabled: bool,

    /// Sliding window size in seconds
    pub window_size_seconds: u64,

    /// Maximum admitted requests per window and client
    pub max_requests: u32,

    /// Paths that never consume a slot (the auth whitelist is added on top)
    pub exclude_paths: Vec<String>,

    /// Upper bound on the number of tracked client keys
    pub max_tracked_clients: usize,

    /// Interval of the idle-key sweep in seconds
    pub sweep_interval_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_size_seconds: 60,
            max_requests: 100,
            exclude_paths: Vec::new(),
            max_tracked_clients: 10_000,
            sweep_interval_seconds: 60,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_size_seconds)
    }
}

/// Backend health probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Probe timeout in seconds
    pub timeout_seconds: u64,

    /// Path probed on every backend
    pub path: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 2,
            path: "/health".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,

    /// Whether to log in JSON format
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Display name reported by the root endpoint
    pub app_name: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Service name to backend base URL
    pub services: HashMap<String, String>,

    /// Proxy configuration
    pub proxy: ProxyConfig,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,

    /// Backend health probe configuration
    pub health: HealthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let mut services = HashMap::new();
        services.insert("backend".to_string(), "http://localhost:8000".to_string());

        Self {
            app_name: "Lite API Gateway".to_string(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            services,
            proxy: ProxyConfig::default(),
            rate_limit: RateLimitConfig::default(),
            health: HealthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a JSON file. Missing sections and fields take
    /// their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadError(format!("cannot read {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&raw).map_err(|e| {
            ConfigError::LoadError(format!("cannot parse {}: {}", path.display(), e))
        })
    }

    /// Paths that bypass the rate limiter: explicit exclusions plus the auth
    /// whitelist.
    pub fn rate_limit_exempt_paths(&self) -> Vec<String> {
        let mut paths = self.rate_limit.exclude_paths.clone();
        for path in &self.auth.whitelist_paths {
            if !paths.contains(path) {
                paths.push(path.clone());
            }
        }
        paths
    }

    /// Reject configurations the gateway cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.auth.secret_key.as_deref() {
            Some(secret) if !secret.is_empty() => {}
            _ => {
                return Err(ConfigError::ValidationError(
                    "auth.secret_key must be set".to_string(),
                ))
            }
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_body_bytes must be positive".to_string(),
            ));
        }

        if self.rate_limit.enabled {
            if self.rate_limit.window_size_seconds == 0 {
                return Err(ConfigError::ValidationError(
                    "rate_limit.window_size_seconds must be positive".to_string(),
                ));
            }
            if self.rate_limit.max_requests == 0 {
                return Err(ConfigError::ValidationError(
                    "rate_limit.max_requests must be positive".to_string(),
                ));
            }
        }

        if self.proxy.prefix.is_empty() || self.proxy.prefix.contains('/') {
            return Err(ConfigError::ValidationError(format!(
                "proxy.prefix '{}' must be a single non-empty path segment",
                self.proxy.prefix
            )));
        }

        for (name, url) in &self.services {
            let parsed = reqwest::Url::parse(url).map_err(|e| {
                ConfigError::ValidationError(format!("service '{}' has invalid URL '{}': {}", name, url, e))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::ValidationError(format!(
                    "service '{}' must use http or https, got '{}'",
                    name,
                    parsed.scheme()
                )));
            }
        }

        for header in [&self.proxy.identity_header, &self.proxy.scopes_header] {
            if hyper::header::HeaderName::from_bytes(header.as_bytes()).is_err() {
                return Err(ConfigError::ValidationError(format!(
                    "'{}' is not a valid header name",
                    header
                )));
            }
        }

        Ok(())
    }
}
