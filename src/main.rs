use clap::Parser;
use tokio::signal;

use lite_gateway::middleware::logging::init_tracing;
use lite_gateway::{ApiGateway, Cli, Gateway, GatewayError};

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    let cli = Cli::parse();

    // Load configuration
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info", false);
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };

    init_tracing(&config.logging.level, config.logging.json_format);
    tracing::info!(
        services = ?config.services.keys().collect::<Vec<_>>(),
        algorithm = %config.auth.algorithm,
        rate_limit = config.rate_limit.enabled,
        "Configuration loaded"
    );

    let gateway = ApiGateway::new(config)?;
    let addr = gateway.start().await?;
    tracing::info!("API Gateway listening on {}", addr);

    // Wait for Ctrl+C
    signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping API Gateway");

    gateway.stop().await?;
    tracing::info!("API Gateway stopped successfully");

    Ok(())
}
