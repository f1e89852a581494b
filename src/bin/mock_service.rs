use std::net::SocketAddr;

use clap::Parser;

use lite_gateway::middleware::logging::init_tracing;
use lite_gateway::mock::{run, MockService};

#[derive(Parser, Debug)]
#[command(name = "mock_service")]
#[command(about = "Mock backend service for exercising the gateway")]
struct Args {
    /// Service to run: user, product or order
    service: MockService,

    /// Host to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on (defaults to 8001, 8002 or 8003 by service)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing("info", false);

    let port = args.port.unwrap_or_else(|| args.service.default_port());
    let addr: SocketAddr = format!("{}:{}", args.host, port).parse()?;

    run(args.service, addr).await?;
    Ok(())
}
