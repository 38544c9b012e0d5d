//! Store keep-alive poller.
//!
//! Polls the provider on a fixed timer through the same read path as
//! ordinary lookups, independent of and non-exclusive with live
//! request traffic. Keeps the adapter connection warm and surfaces
//! store outages in the logs before a request hits them.

use std::time::Duration;

use tokio::sync::watch;

use crate::state::State;

/// Poll until shutdown. The interval is floored at one second;
/// `tokio::time::interval` panics on a zero period.
pub async fn run(state: State, interval: Duration, mut shutdown_rx: watch::Receiver<()>) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
    // The first tick fires immediately; skip it so startup stays quiet
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if state.is_ready().await {
                    tracing::trace!("keep-alive poll ok");
                } else {
                    tracing::warn!("keep-alive poll failed, store provider unavailable");
                }
            }
            _ = shutdown_rx.changed() => break,
        }
    }
    tracing::debug!("keep-alive poller stopped");
}
