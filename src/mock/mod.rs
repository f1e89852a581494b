// Mock backend services for local runs and tests

pub mod models;
pub mod routes;

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::{
    extract::Extension,
    routing::{any, get},
    Router,
};

use crate::mock::routes::{
    create_order, delayed_response, echo, error_response, get_product, health_check, info,
    list_orders, list_products, list_users, redirect_to_echo, root, user_profile,
};

/// Which mock backend to serve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockService {
    User,
    Product,
    Order,
}

impl MockService {
    pub fn name(&self) -> &'static str {
        match self {
            MockService::User => "user",
            MockService::Product => "product",
            MockService::Order => "order",
        }
    }

    /// Conventional local port
    pub fn default_port(&self) -> u16 {
        match self {
            MockService::User => 8001,
            MockService::Product => 8002,
            MockService::Order => 8003,
        }
    }
}

impl fmt::Display for MockService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MockService {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(MockService::User),
            "product" => Ok(MockService::Product),
            "order" => Ok(MockService::Order),
            other => Err(format!(
                "unknown service '{}', available services: user, product, order",
                other
            )),
        }
    }
}

/// Routes of one mock service
pub fn router(service: MockService) -> Router {
    let common = Router::new()
        .route("/", get(root))
        .route("/info", get(info))
        .route("/health", get(health_check))
        .route("/echo", any(echo))
        .route("/redirect", any(redirect_to_echo))
        .route("/delay/:duration_ms", get(delayed_response))
        .route("/status/:status_code", any(error_response));

    let specific = match service {
        MockService::User => Router::new()
            .route("/profile", get(user_profile))
            .route("/users", get(list_users)),
        MockService::Product => Router::new()
            .route("/products", get(list_products))
            .route("/products/:product_id", get(get_product)),
        MockService::Order => Router::new().route("/orders", get(list_orders).post(create_order)),
    };

    common.merge(specific).layer(Extension(service))
}

/// Serve `service` on `addr` until the task is dropped
pub async fn run(service: MockService, addr: SocketAddr) -> Result<(), hyper::Error> {
    tracing::info!("Mock {} service listening on {}", service, addr);
    axum::Server::bind(&addr)
        .serve(router(service).into_make_service())
        .await
}
