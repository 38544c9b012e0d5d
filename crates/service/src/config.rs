use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // http server configuration
    /// address for the API server to listen on.
    ///  if not set then 0.0.0.0:3000 will be used
    pub listen_addr: Option<SocketAddr>,

    // session configuration
    /// hex-encoded secret for the token signer, if not set then a
    ///  fresh secret is generated (tokens won't survive a restart)
    pub token_secret_hex: Option<String>,

    // background tasks
    /// interval of the store keep-alive poller
    pub keepalive_interval: Duration,

    // misc
    pub log_level: tracing::Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: Some(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 3000)),
            token_secret_hex: None,
            keepalive_interval: Duration::from_secs(30),
            log_level: tracing::Level::INFO,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid token secret hex: {0}")]
    TokenSecret(#[from] hex::FromHexError),
    #[error("invalid socket address: {0}")]
    ListenAddr(#[from] std::net::AddrParseError),
}
