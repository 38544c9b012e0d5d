//! HTTP service for the Gatehouse access gateway.
//!
//! This crate wires the domain components from `common` behind an axum
//! surface:
//! - State management (provider, ACL, content gateway, accounts, token
//!   signer) in [`state`]
//! - Per-endpoint handlers and routers in [`http`]
//! - Bearer-token extractors in [`extract`]
//! - Process bootstrap (logging, shutdown, background tasks) in
//!   [`process`]

pub mod config;
pub mod extract;
pub mod http;
pub mod keepalive;
pub mod process;
pub mod state;

// Re-export key types for consumers (binary, tests)
pub use config::Config;
pub use process::{spawn_service, ShutdownHandle};
pub use state::{State as ServiceState, StateSetupError};
