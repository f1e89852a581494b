use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sha2::Sha256;

use lite_gateway::mock::{router, MockService};
use lite_gateway::{ApiGateway, Claims, Gateway, GatewayConfig};

const SECRET: &str = "integration-secret";

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn token_for(claims: Claims) -> String {
    let key: Hmac<Sha256> = Hmac::new_from_slice(SECRET.as_bytes()).unwrap();
    claims.sign_with_key(&key).unwrap()
}

fn valid_token(sub: &str) -> String {
    token_for(Claims::new(sub, unix_now() + 3600).with_scopes(vec!["read", "write"]))
}

/// Start a mock backend on an ephemeral port
fn spawn_backend(service: MockService) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::Server::from_tcp(listener)
            .unwrap()
            .serve(router(service).into_make_service())
            .await
            .unwrap();
    });
    addr
}

/// An address with nothing listening on it
fn dead_address() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

fn base_config(services: &[(&str, SocketAddr)]) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.server.port = 0;
    config.auth.secret_key = Some(SECRET.to_string());
    config.services = services
        .iter()
        .map(|(name, addr)| (name.to_string(), format!("http://{}", addr)))
        .collect::<HashMap<_, _>>();
    config.health.timeout_seconds = 1;
    config
}

struct TestGateway {
    gateway: ApiGateway,
    base: String,
    client: Client,
}

impl TestGateway {
    async fn start(config: GatewayConfig) -> Self {
        let gateway = ApiGateway::new(config).unwrap();
        let addr = gateway.start().await.unwrap();
        Self {
            gateway,
            base: format!("http://{}", addr),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.unwrap()
    }

    async fn stop(self) {
        self.gateway.stop().await.unwrap();
    }
}

#[tokio::test]
async fn test_identity_headers_reach_backend() {
    let user = spawn_backend(MockService::User);
    let gateway = TestGateway::start(base_config(&[("user", user)])).await;

    let response = gateway
        .client
        .get(gateway.url("/api/user/echo?greeting=hi"))
        .bearer_auth(valid_token("42"))
        .header("X-User-ID", "admin")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["x-ratelimit-limit"], "100");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "99");

    let body: Value = response.json().await.unwrap();
    let received = &body["received"];
    assert_eq!(received["headers"]["x-user-id"], "42");
    assert_eq!(received["headers"]["x-user-scopes"], "read write");
    assert_eq!(received["query_params"]["greeting"], "hi");
    assert_eq!(received["method"], "GET");

    gateway.stop().await;
}

#[tokio::test]
async fn test_path_rewrite_and_body_forwarding() {
    let order = spawn_backend(MockService::Order);
    let gateway = TestGateway::start(base_config(&[("order", order)])).await;

    let response = gateway
        .client
        .post(gateway.url("/api/order/orders"))
        .bearer_auth(valid_token("7"))
        .json(&json!({ "user_id": 7, "product_id": 2, "quantity": 3 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total"], 300);
    assert_eq!(body["status"], "created");

    gateway.stop().await;
}

#[tokio::test]
async fn test_backend_redirect_is_followed() {
    let user = spawn_backend(MockService::User);
    let gateway = TestGateway::start(base_config(&[("user", user)])).await;

    let response = gateway
        .client
        .post(gateway.url("/api/user/redirect"))
        .bearer_auth(valid_token("42"))
        .json(&json!({ "note": "kept" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["received"]["url"], "/echo");
    assert_eq!(body["received"]["method"], "POST");
    assert_eq!(body["received"]["body"]["note"], "kept");
    assert_eq!(body["received"]["headers"]["x-user-id"], "42");

    gateway.stop().await;
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let user = spawn_backend(MockService::User);
    let mut config = base_config(&[("user", user)]);
    config.server.max_body_bytes = 1024;
    let gateway = TestGateway::start(config).await;

    let response = gateway
        .client
        .post(gateway.url("/api/user/echo"))
        .bearer_auth(valid_token("42"))
        .body(vec![b'x'; 4096])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = gateway
        .client
        .post(gateway.url("/api/user/echo"))
        .bearer_auth(valid_token("42"))
        .body(vec![b'x'; 512])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    gateway.stop().await;
}

#[tokio::test]
async fn test_backend_errors_are_relayed() {
    let product = spawn_backend(MockService::Product);
    let gateway = TestGateway::start(base_config(&[("product", product)])).await;
    let token = valid_token("1");

    let response = gateway.get("/api/product/products/99", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "Product not found");

    let response = gateway.get("/api/product/status/503", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    gateway.stop().await;
}

#[tokio::test]
async fn test_expired_and_tampered_tokens_rejected() {
    let user = spawn_backend(MockService::User);
    let gateway = TestGateway::start(base_config(&[("user", user)])).await;

    let expired = token_for(Claims::new("42", unix_now() - 60));
    let response = gateway.get("/api/user/profile", Some(&expired)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["www-authenticate"], "Bearer");

    // Swap the payload of a valid token for another subject's
    let valid = valid_token("42");
    let other = valid_token("1");
    let mut parts: Vec<&str> = valid.split('.').collect();
    parts[1] = other.split('.').nth(1).unwrap();
    let tampered = parts.join(".");
    let response = gateway.get("/api/user/profile", Some(&tampered)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = gateway.get("/api/user/profile", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Missing authentication credentials");

    gateway.stop().await;
}

#[tokio::test]
async fn test_unknown_service_is_not_found() {
    let gateway = TestGateway::start(base_config(&[])).await;
    let token = valid_token("42");

    let response = gateway.get("/api/billing/invoices", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Service 'billing' not found");

    gateway.stop().await;
}

#[tokio::test]
async fn test_allow_listed_paths_pass_without_credentials() {
    let mut config = base_config(&[]);
    config.rate_limit.max_requests = 1;
    let gateway = TestGateway::start(config).await;

    for _ in 0..5 {
        let response = gateway.get("/", Some("garbage")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-ratelimit-limit"));

        let response = gateway.get("/openapi.json", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Allow-listed but not served locally
    let response = gateway.get("/api/auth/login", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    gateway.stop().await;
}

#[tokio::test]
async fn test_rate_limit_headers_and_rejection() {
    let user = spawn_backend(MockService::User);
    let mut config = base_config(&[("user", user)]);
    config.rate_limit.max_requests = 3;
    let gateway = TestGateway::start(config).await;
    let token = valid_token("42");

    let first = unix_now();
    for expected_remaining in ["2", "1", "0"] {
        let response = gateway.get("/api/user/users", Some(&token)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-remaining"], expected_remaining);
    }

    let response = gateway.get("/api/user/users", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");

    let reset: u64 = response.headers()["x-ratelimit-reset"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(reset >= first + 59 && reset <= unix_now() + 61, "reset {}", reset);

    gateway.stop().await;
}

#[tokio::test]
async fn test_unreachable_backend_is_bad_gateway() {
    let gateway = TestGateway::start(base_config(&[("user", dead_address())])).await;

    let response = gateway.get("/api/user/profile", Some(&valid_token("42"))).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Upstream service unavailable");

    gateway.stop().await;
}

#[tokio::test]
async fn test_slow_backend_is_gateway_timeout() {
    let user = spawn_backend(MockService::User);
    let mut config = base_config(&[("user", user)]);
    config.proxy.timeout_seconds = 1;
    let gateway = TestGateway::start(config).await;

    let response = gateway.get("/api/user/delay/3000", Some(&valid_token("42"))).await;
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

    gateway.stop().await;
}

#[tokio::test]
async fn test_health_reports_backends() {
    let user = spawn_backend(MockService::User);
    let gateway = TestGateway::start(base_config(&[("user", user)])).await;

    let response = gateway.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["user"]["status"], "healthy");
    gateway.stop().await;

    let gateway = TestGateway::start(base_config(&[("user", user), ("order", dead_address())])).await;
    let response = gateway.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["services"]["order"]["status"], "unhealthy");
    assert_eq!(body["services"]["user"]["status"], "healthy");
    gateway.stop().await;
}

#[tokio::test]
async fn test_cors_preflight_answered() {
    let gateway = TestGateway::start(base_config(&[])).await;

    let response = gateway
        .client
        .request(reqwest::Method::OPTIONS, gateway.url("/api/user/profile"))
        .header("Origin", "http://example.com")
        .header("Access-Control-Request-Method", "GET")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("access-control-allow-origin"));

    gateway.stop().await;
}

#[tokio::test]
async fn test_stop_with_idle_connection_is_bounded() {
    let mut config = base_config(&[]);
    config.server.shutdown_grace_seconds = 1;
    let gateway = TestGateway::start(config).await;

    // Connected but never sends a request
    let addr = gateway.base.trim_start_matches("http://").to_string();
    let _idle = tokio::net::TcpStream::connect(addr).await.unwrap();

    let stopped = tokio::time::timeout(Duration::from_secs(5), gateway.stop()).await;
    assert!(stopped.is_ok(), "stop did not finish within the grace period");
}

#[tokio::test]
async fn test_graceful_stop_releases_port() {
    let gateway = TestGateway::start(base_config(&[])).await;
    let url = gateway.url("/");
    gateway.stop().await;

    let result = Client::builder()
        .timeout(Duration::from_secs(1))
        .build()
        .unwrap()
        .get(url)
        .send()
        .await;
    assert!(result.is_err());
}
