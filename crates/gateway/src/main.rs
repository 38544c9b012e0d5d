//! Gatehouse gateway - HTTP server for the access gateway.
//!
//! Wires up configuration from the command line, starts the service
//! (HTTP surface, outbox worker, keep-alive poller) and waits for
//! shutdown.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use service::{spawn_service, Config};

/// Gatehouse - signature-authorized access gateway
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on for HTTP requests
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Hex-encoded token signing secret. If not set a fresh secret is
    /// generated and tokens will not survive a restart.
    #[arg(long, env = "GATEHOUSE_TOKEN_SECRET")]
    token_secret: Option<String>,

    /// Interval of the store keep-alive poller, in seconds (at least 1)
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    keepalive_interval: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config {
        listen_addr: Some(SocketAddr::from_str(&format!("0.0.0.0:{}", args.port))?),
        token_secret_hex: args.token_secret,
        keepalive_interval: Duration::from_secs(args.keepalive_interval),
        log_level: args.log_level.parse().unwrap_or(tracing::Level::INFO),
    };

    let _guard = service::process::init_logging(&config);

    tracing::info!("starting Gatehouse gateway");

    let handle = match spawn_service(config) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("failed to start service: {}", e);
            std::process::exit(1);
        }
    };

    handle.wait().await;
    tracing::info!("gateway shutdown complete");
    Ok(())
}
