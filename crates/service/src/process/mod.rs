use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use common::prelude::LogSink;

use crate::config::Config;
use crate::http;
use crate::keepalive;
use crate::state::{State, StateSetupError};

const FINAL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle for gracefully shutting down the service.
pub struct ShutdownHandle {
    handles: Vec<tokio::task::JoinHandle<()>>,
    shutdown_tx: watch::Sender<()>,
}

impl ShutdownHandle {
    /// Block until every background task has exited.
    pub async fn wait(self) {
        for handle in self.handles {
            let _ = tokio::time::timeout(FINAL_SHUTDOWN_TIMEOUT, handle).await;
        }
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Initialize logging. Returns a guard that must be kept alive for the
/// duration of the program.
pub fn init_logging(config: &Config) -> tracing_appender::non_blocking::WorkerGuard {
    let (stdout_writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let env_filter = EnvFilter::builder()
        .with_default_directive(config.log_level.into())
        .from_env_lossy();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout_writer)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stdout_layer).init();
    guard
}

/// Build state and spawn the HTTP server plus background tasks
/// (outbox worker, keep-alive poller). Shutdown fires on ctrl-c or via
/// the returned handle.
pub fn spawn_service(config: Config) -> Result<ShutdownHandle, StateSetupError> {
    let (state, outbox) = State::from_config(&config)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    // ctrl-c trips the same shutdown channel
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received shutdown signal");
            let _ = signal_tx.send(());
        }
    });

    let mut handles = Vec::new();

    let server_state = state.clone();
    let server_config = config.clone();
    let server_rx = shutdown_rx.clone();
    handles.push(tokio::spawn(async move {
        if let Err(e) = http::run(server_config, server_state, server_rx).await {
            tracing::error!("HTTP server error: {}", e);
        }
    }));

    let outbox_rx = shutdown_rx.clone();
    handles.push(tokio::spawn(outbox.run(LogSink, outbox_rx)));

    handles.push(tokio::spawn(keepalive::run(
        state,
        config.keepalive_interval,
        shutdown_rx,
    )));

    Ok(ShutdownHandle {
        handles,
        shutdown_tx,
    })
}
