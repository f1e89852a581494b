use std::collections::{HashMap, HashSet};

use crate::config::{GatewayConfig, ProxyConfig};
use crate::models::BackendTarget;

/// Route decision for one request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Not a proxy path, or a reserved local service
    Local,

    /// Forward to a registered backend
    Proxy(BackendTarget),

    /// Proxy path naming a service that is not registered
    UnknownService(String),
}

/// Maps `/<prefix>/<service>/<rest...>` paths to backend targets
///
/// The service table is fixed at construction for the lifetime of the
/// process.
#[derive(Debug, Clone)]
pub struct ServiceRouter {
    prefix: String,
    local_services: HashSet<String>,
    services: HashMap<String, String>,
}

impl ServiceRouter {
    pub fn new(
        prefix: impl Into<String>,
        local_services: impl IntoIterator<Item = String>,
        services: HashMap<String, String>,
    ) -> Self {
        let services = services
            .into_iter()
            .map(|(name, url)| (name, url.trim_end_matches('/').to_string()))
            .collect();

        Self {
            prefix: prefix.into(),
            local_services: local_services.into_iter().collect(),
            services,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        let ProxyConfig {
            prefix,
            local_services,
            ..
        } = &config.proxy;
        Self::new(prefix.clone(), local_services.clone(), config.services.clone())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Registered services, sorted by name
    pub fn services(&self) -> Vec<(&str, &str)> {
        let mut services: Vec<_> = self
            .services
            .iter()
            .map(|(name, url)| (name.as_str(), url.as_str()))
            .collect();
        services.sort();
        services
    }

    /// Decide where a request path goes
    pub fn resolve(&self, path: &str) -> RouteDecision {
        let marker = format!("/{}/", self.prefix);
        if !path.starts_with(&marker) || path.matches('/').count() < 3 {
            return RouteDecision::Local;
        }

        // ["", prefix, service, rest...]
        let mut segments = path.split('/').skip(2);
        let service = match segments.next() {
            Some(service) => service,
            None => return RouteDecision::Local,
        };

        if self.local_services.contains(service) {
            return RouteDecision::Local;
        }

        let base_url = match self.services.get(service) {
            Some(url) => url,
            None => return RouteDecision::UnknownService(service.to_string()),
        };

        let rest: Vec<&str> = segments.collect();
        RouteDecision::Proxy(BackendTarget {
            service: service.to_string(),
            base_url: base_url.clone(),
            path: format!("/{}", rest.join("/")),
        })
    }
}
