// API Gateway Library

pub mod config;
pub mod core;
pub mod error;
pub mod middleware;
pub mod mock;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use config::{cli::Cli, GatewayConfig};
pub use crate::core::{
    gateway::{ApiGateway, Gateway},
    pipeline::Pipeline,
    request::GatewayRequest,
    response::GatewayResponse,
    router::{RouteDecision, ServiceRouter},
};
pub use error::{AuthError, ConfigError, GatewayError};
pub use middleware::auth::models::{Claims, JwtAlgorithm};
pub use middleware::rate_limit::{RateDecision, SlidingWindowLimiter};
