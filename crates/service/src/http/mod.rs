use axum::extract::DefaultBodyLimit;
use axum::Router;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN};
use http::Method;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse};
use tower_http::LatencyUnit;

pub mod api;
pub mod handlers;
pub mod health;

use crate::config::Config;
use crate::state::State;

const STATUS_PREFIX: &str = "/_status";

/// Maximum request body size in bytes (10 MB)
pub const MAX_BODY_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Build the full application router: the API surface at the root plus
/// `/_status` health routes.
pub fn router(state: State) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(vec![Method::POST, Method::DELETE])
        .allow_headers(vec![ACCEPT, ORIGIN, CONTENT_TYPE, AUTHORIZATION])
        .allow_origin(Any)
        .allow_credentials(false);

    Router::new()
        .nest(STATUS_PREFIX, health::router(state.clone()))
        .merge(api::router(state.clone()))
        .fallback(handlers::not_found_handler)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP server until the shutdown channel fires.
pub async fn run(
    config: Config,
    state: State,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let listen_addr = config
        .listen_addr
        .unwrap_or_else(|| ([0, 0, 0, 0], 3000).into());
    let log_level = config.log_level;
    let trace_layer = TraceLayer::new_for_http()
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(log_level)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));

    let router = router(state).layer(trace_layer);

    tracing::info!(addr = ?listen_addr, "API server listening");
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("an error occurred running the HTTP server: {0}")]
    ServingFailed(#[from] std::io::Error),
}
