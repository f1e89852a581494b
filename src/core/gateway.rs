use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{boxed, Bytes, Full};
use axum::extract::{ConnectInfo, DefaultBodyLimit, State};
use axum::http::{HeaderMap, Method, Uri};
use axum::response::Response;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::core::pipeline::Pipeline;
use crate::core::request::GatewayRequest;
use crate::core::response::GatewayResponse;
use crate::error::GatewayError;

/// Core API Gateway trait that defines the main functionality
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Process an incoming request and return a response
    async fn process_request(&self, request: GatewayRequest) -> GatewayResponse;

    /// Start the gateway server, returning the bound address
    async fn start(&self) -> Result<SocketAddr, GatewayError>;

    /// Stop the gateway server
    async fn stop(&self) -> Result<(), GatewayError>;
}

/// HTTP front end of the gateway
#[derive(Clone)]
pub struct ApiGateway {
    config: GatewayConfig,
    pipeline: Arc<Pipeline>,
    server_state: Arc<tokio::sync::Mutex<ServerState>>,
}

/// Server state that can be mutated
#[derive(Default)]
struct ServerState {
    /// Server task
    server_handle: Option<tokio::task::JoinHandle<()>>,
    /// Shutdown signal sender
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    /// Rate limit sweeper task
    sweeper_handle: Option<tokio::task::JoinHandle<()>>,
}

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    trust_forwarded_for: bool,
}

impl ApiGateway {
    /// Create a gateway with the standard pipeline for `config`
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let pipeline = Pipeline::from_config(&config)?;
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Create a gateway around an already built pipeline
    pub fn with_pipeline(config: GatewayConfig, pipeline: Pipeline) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
            server_state: Arc::new(tokio::sync::Mutex::new(ServerState::default())),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub async fn is_running(&self) -> bool {
        self.server_state.lock().await.server_handle.is_some()
    }

    fn app(&self) -> axum::Router {
        let state = AppState {
            pipeline: self.pipeline.clone(),
            trust_forwarded_for: self.config.server.trust_forwarded_for,
        };

        axum::Router::new()
            .fallback(handle_request)
            .with_state(state)
            .layer(DefaultBodyLimit::max(self.config.server.max_body_bytes))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }
}

#[async_trait]
impl Gateway for ApiGateway {
    async fn process_request(&self, request: GatewayRequest) -> GatewayResponse {
        self.pipeline.process(request).await
    }

    async fn start(&self) -> Result<SocketAddr, GatewayError> {
        let mut server_state = self.server_state.lock().await;
        if server_state.server_handle.is_some() {
            return Err(GatewayError::InternalError(
                "Server is already running".to_string(),
            ));
        }

        let addr: SocketAddr = format!("{}:{}", self.config.server.host, self.config.server.port)
            .parse()
            .map_err(|e| GatewayError::InternalError(format!("Invalid address: {}", e)))?;

        let listener = std::net::TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        let server = axum::Server::from_tcp(listener)
            .map_err(|e| GatewayError::InternalError(format!("Failed to create server: {}", e)))?
            .serve(self.app().into_make_service_with_connect_info::<SocketAddr>());

        tracing::info!("Starting {} on {}", self.config.app_name, local_addr);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let server_handle = tokio::spawn(async move {
            let graceful = server.with_graceful_shutdown(async {
                shutdown_rx.await.ok();
                tracing::info!("Shutdown signal received, starting graceful shutdown");
            });

            if let Err(e) = graceful.await {
                tracing::error!("Server error: {}", e);
            }

            tracing::info!("Server on {} has been shut down", local_addr);
        });

        if let Some(limiter) = self.pipeline.limiter() {
            let interval = Duration::from_secs(self.config.rate_limit.sweep_interval_seconds.max(1));
            server_state.sweeper_handle = Some(limiter.spawn_sweeper(interval));
        }
        server_state.server_handle = Some(server_handle);
        server_state.shutdown_tx = Some(shutdown_tx);

        tracing::info!("API Gateway server started successfully");
        Ok(local_addr)
    }

    async fn stop(&self) -> Result<(), GatewayError> {
        let mut server_state = self.server_state.lock().await;

        let mut handle = match server_state.server_handle.take() {
            Some(handle) => handle,
            None => {
                return Err(GatewayError::InternalError(
                    "Server is not running".to_string(),
                ))
            }
        };

        if let Some(sweeper) = server_state.sweeper_handle.take() {
            sweeper.abort();
        }

        if let Some(tx) = server_state.shutdown_tx.take() {
            // The server may already have exited
            let _ = tx.send(());
            tracing::info!("Shutdown signal sent to server");
        }

        let grace = self.config.server.shutdown_grace();
        match tokio::time::timeout(grace, &mut handle).await {
            Ok(joined) => {
                joined.map_err(|e| {
                    tracing::error!("Error while shutting down server: {}", e);
                    GatewayError::InternalError(format!("Error while shutting down server: {}", e))
                })?;
                tracing::info!("Server has been shut down gracefully");
            }
            Err(_) => {
                tracing::warn!(
                    grace_seconds = grace.as_secs(),
                    "Connections still open after grace period, aborting server"
                );
                handle.abort();
                // Cancellation is the expected outcome here
                let _ = handle.await;
            }
        }

        Ok(())
    }
}

/// Bodies over `server.max_body_bytes` are rejected with 413 by the `Bytes` extractor
async fn handle_request(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let forwarded = if state.trust_forwarded_for {
        forwarded_client_ip(&headers)
    } else {
        None
    };
    let client_ip = forwarded.unwrap_or_else(|| peer.ip());

    let request = GatewayRequest::new(method, uri, headers, body, Some(client_ip));

    into_response(state.pipeline.process(request).await)
}

/// First address in `X-Forwarded-For`
fn forwarded_client_ip(headers: &hyper::HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse().ok())
}

fn into_response(response: GatewayResponse) -> Response {
    let mut converted = Response::new(boxed(Full::from(response.body)));
    *converted.status_mut() = response.status;
    *converted.headers_mut() = response.headers;
    converted
}
