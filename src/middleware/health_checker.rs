use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::config::HealthConfig;
use crate::error::GatewayError;
use crate::models::{BackendHealth, HealthReport, HEALTHY, UNHEALTHY};

/// Probes a single backend
#[async_trait]
pub trait HealthChecker: Send + Sync {
    async fn check_health(&self, service: &str, base_url: &str) -> BackendHealth;
}

/// HTTP health checker: a backend is healthy when `GET <base_url><path>`
/// answers 200 before the probe timeout
#[derive(Clone)]
pub struct HttpHealthChecker {
    client: Client,
    path: String,
    timeout: Duration,
}

impl HttpHealthChecker {
    pub fn new(config: &HealthConfig) -> Result<Self, GatewayError> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| GatewayError::InternalError(format!("Failed to build health check client: {}", e)))?;

        Ok(Self {
            client,
            path: config.path.clone(),
            timeout,
        })
    }
}

#[async_trait]
impl HealthChecker for HttpHealthChecker {
    async fn check_health(&self, service: &str, base_url: &str) -> BackendHealth {
        let url = format!("{}{}", base_url.trim_end_matches('/'), self.path);
        let started = Instant::now();

        debug!("Performing health check for backend {} at {}", service, url);

        match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(response) => {
                let status = response.status();
                let elapsed = started.elapsed().as_millis();
                if status == StatusCode::OK {
                    debug!(
                        "Health check successful for backend {} (status: {}, time: {}ms)",
                        service, status, elapsed
                    );
                    BackendHealth {
                        status: HEALTHY.to_string(),
                        url,
                        status_code: Some(status.as_u16()),
                        error: None,
                    }
                } else {
                    warn!(
                        "Health check failed for backend {} (status: {}, time: {}ms)",
                        service, status, elapsed
                    );
                    BackendHealth {
                        status: UNHEALTHY.to_string(),
                        url,
                        status_code: Some(status.as_u16()),
                        error: Some(format!("unexpected status {}", status.as_u16())),
                    }
                }
            }
            Err(e) => {
                warn!("Health check error for backend {}: {}", service, e);
                BackendHealth {
                    status: UNHEALTHY.to_string(),
                    url,
                    status_code: None,
                    error: Some(if e.is_timeout() {
                        "timed out".to_string()
                    } else {
                        "unreachable".to_string()
                    }),
                }
            }
        }
    }
}

/// Probe every backend concurrently and aggregate the results
pub async fn check_all<C>(checker: &C, services: &[(&str, &str)]) -> HealthReport
where
    C: HealthChecker + ?Sized,
{
    let probes = services.iter().map(|(name, url)| async move {
        (name.to_string(), checker.check_health(name, url).await)
    });

    let results: BTreeMap<String, BackendHealth> = join_all(probes).await.into_iter().collect();
    let report = HealthReport::from_results(results);

    if !report.is_healthy() {
        warn!(failing = ?report.failing_services(), "Backend health check reported failures");
    }
    report
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::{routing::get, Router};

    use super::*;

    async fn spawn_backend(status: StatusCode) -> SocketAddr {
        let app = Router::new().route("/health", get(move || async move { status }));
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::Server::from_tcp(listener)
                .unwrap()
                .serve(app.into_make_service())
                .await
                .unwrap();
        });
        addr
    }

    fn checker() -> HttpHealthChecker {
        HttpHealthChecker::new(&HealthConfig {
            timeout_seconds: 1,
            ..HealthConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_healthy_backend() {
        let addr = spawn_backend(StatusCode::OK).await;
        let health = checker().check_health("user", &format!("http://{}/", addr)).await;

        assert!(health.is_healthy());
        assert_eq!(health.status_code, Some(200));
        assert_eq!(health.url, format!("http://{}/health", addr));
    }

    #[tokio::test]
    async fn test_error_status_is_unhealthy() {
        let addr = spawn_backend(StatusCode::SERVICE_UNAVAILABLE).await;
        let health = checker().check_health("user", &format!("http://{}", addr)).await;

        assert!(!health.is_healthy());
        assert_eq!(health.status_code, Some(503));
    }

    #[tokio::test]
    async fn test_non_200_success_is_unhealthy() {
        let addr = spawn_backend(StatusCode::NO_CONTENT).await;
        let health = checker().check_health("user", &format!("http://{}", addr)).await;

        assert!(!health.is_healthy());
        assert_eq!(health.status_code, Some(204));
        assert_eq!(health.error.as_deref(), Some("unexpected status 204"));
    }

    #[tokio::test]
    async fn test_check_all_names_failures() {
        let up = spawn_backend(StatusCode::OK).await;
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let down = listener.local_addr().unwrap();
        drop(listener);

        let up_url = format!("http://{}", up);
        let down_url = format!("http://{}", down);
        let report = check_all(&checker(), &[("user", &up_url), ("order", &down_url)]).await;

        assert!(!report.is_healthy());
        assert_eq!(report.failing_services(), vec!["order"]);
        assert!(report.services["user"].is_healthy());
        assert_eq!(report.services["order"].error.as_deref(), Some("unreachable"));
    }
}
