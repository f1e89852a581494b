use tracing::{Level, Span};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::core::request::GatewayRequest;

/// Initialize the tracing system
///
/// `RUST_LOG` wins over `log_level` when set. Calling this more than once is
/// harmless; later calls leave the first subscriber in place.
pub fn init_tracing(log_level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match log_level {
            "trace" | "debug" | "info" | "warn" | "error" => EnvFilter::new(log_level),
            _ => EnvFilter::new("info"),
        }
    });

    let result = if json {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .json();
        Registry::default().with(env_filter).with(fmt_layer).try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339());
        Registry::default().with(env_filter).with(fmt_layer).try_init()
    };

    if result.is_ok() {
        tracing::info!(json, "Tracing system initialized");
    }
}

/// Span covering one request through the pipeline
pub fn request_span(request: &GatewayRequest) -> Span {
    tracing::span!(
        Level::INFO,
        "request",
        request_id = %request.request_id,
        method = %request.method,
        path = %request.path(),
        client = %request.client_key(),
    )
}
