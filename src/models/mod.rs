// Models for the API Gateway

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Resolved destination of one proxied call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    /// Service name taken from the request path
    pub service: String,

    /// Backend base URL without trailing slash
    pub base_url: String,

    /// Rewritten downstream path, always starting with `/`
    pub path: String,
}

impl BackendTarget {
    /// Full target URL, with the inbound query string appended verbatim
    pub fn url(&self, query: Option<&str>) -> String {
        match query {
            Some(query) if !query.is_empty() => format!("{}{}?{}", self.base_url, self.path, query),
            _ => format!("{}{}", self.base_url, self.path),
        }
    }
}

/// Health of one configured backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHealth {
    /// `healthy` or `unhealthy`
    pub status: String,

    /// Probed URL
    pub url: String,

    /// HTTP status returned by the probe, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackendHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == HEALTHY
    }
}

pub const HEALTHY: &str = "healthy";
pub const UNHEALTHY: &str = "unhealthy";

/// Aggregate health reported by the `/health` endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// `healthy` only when every backend is healthy
    pub status: String,

    /// Per-backend results keyed by service name
    pub services: BTreeMap<String, BackendHealth>,
}

impl HealthReport {
    pub fn from_results(services: BTreeMap<String, BackendHealth>) -> Self {
        let status = if services.values().all(BackendHealth::is_healthy) {
            HEALTHY
        } else {
            UNHEALTHY
        };

        Self {
            status: status.to_string(),
            services,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HEALTHY
    }

    /// Names of the backends that failed their probe
    pub fn failing_services(&self) -> Vec<&str> {
        self.services
            .iter()
            .filter(|(_, health)| !health.is_healthy())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}
