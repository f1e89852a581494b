use std::sync::Arc;

use hyper::{Method, StatusCode};
use serde_json::json;

use crate::core::request::GatewayRequest;
use crate::core::response::GatewayResponse;
use crate::core::router::ServiceRouter;
use crate::middleware::health_checker::{check_all, HealthChecker};

const LOCAL_ROUTES: &[&str] = &["/", "/health", "/openapi.json"];

/// Endpoints served by the gateway itself
pub struct LocalHandler {
    app_name: String,
    router: Arc<ServiceRouter>,
    health_checker: Arc<dyn HealthChecker>,
}

impl LocalHandler {
    pub fn new(
        app_name: impl Into<String>,
        router: Arc<ServiceRouter>,
        health_checker: Arc<dyn HealthChecker>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            router,
            health_checker,
        }
    }

    pub async fn handle(&self, request: &GatewayRequest) -> GatewayResponse {
        let path = request.path();
        if !LOCAL_ROUTES.contains(&path) {
            return GatewayResponse::error(StatusCode::NOT_FOUND, "Not Found");
        }
        if request.method != Method::GET && request.method != Method::HEAD {
            return GatewayResponse::error(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        }

        match path {
            "/" => self.root(),
            "/health" => self.health().await,
            _ => self.openapi(),
        }
    }

    fn root(&self) -> GatewayResponse {
        let services: Vec<&str> = self.router.services().into_iter().map(|(name, _)| name).collect();
        GatewayResponse::json(
            StatusCode::OK,
            &json!({
                "message": format!("Welcome to {}", self.app_name),
                "version": env!("CARGO_PKG_VERSION"),
                "services": services,
            }),
        )
    }

    async fn health(&self) -> GatewayResponse {
        let services = self.router.services();
        let report = check_all(self.health_checker.as_ref(), &services).await;
        let status = if report.is_healthy() {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };

        GatewayResponse::json(
            status,
            &json!({
                "status": report.status,
                "gateway": "healthy",
                "services": report.services,
            }),
        )
    }

    fn openapi(&self) -> GatewayResponse {
        let mut paths = serde_json::Map::new();
        paths.insert("/".into(), json!({ "get": { "summary": "Gateway information" } }));
        paths.insert(
            "/health".into(),
            json!({ "get": { "summary": "Aggregate backend health" } }),
        );
        for (name, _) in self.router.services() {
            paths.insert(
                format!("/{}/{}/{{path}}", self.router.prefix(), name),
                json!({
                    "summary": format!("Proxied to the {} service", name),
                    "security": [{ "bearerAuth": [] }],
                }),
            );
        }

        GatewayResponse::json(
            StatusCode::OK,
            &json!({
                "openapi": "3.0.3",
                "info": { "title": self.app_name, "version": env!("CARGO_PKG_VERSION") },
                "paths": paths,
                "components": {
                    "securitySchemes": {
                        "bearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
                    }
                }
            }),
        )
    }
}
