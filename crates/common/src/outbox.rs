//! Replication notification outbox.
//!
//! ACL and data mutations notify a replication/pinning sink keyed by
//! the stored document id. Delivery is decoupled from the write path:
//! mutations enqueue onto a channel and return immediately; a
//! background worker drains the channel and delivers with bounded
//! retries (at-least-once toward an idempotent consumer). A sink
//! failure can therefore never be mistaken for a storage failure.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

const DELIVERY_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(250);

/// Consumer side of the notification channel.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    /// Deliver one notification. Must be idempotent: the worker may
    /// deliver the same id more than once.
    async fn notify(&self, id: &str) -> anyhow::Result<()>;
}

/// Sink that only logs. Default when no replication peer is configured.
#[derive(Debug, Clone, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, id: &str) -> anyhow::Result<()> {
        tracing::info!(id, "replication notification");
        Ok(())
    }
}

/// Cloneable handle for enqueueing notifications.
#[derive(Debug, Clone)]
pub struct OutboxDispatcher {
    tx: flume::Sender<String>,
}

impl OutboxDispatcher {
    /// Enqueue a notification. Non-blocking; the only failure mode is
    /// a dropped worker, which callers log rather than surface.
    pub fn dispatch(&self, id: impl Into<String>) {
        let id = id.into();
        if let Err(e) = self.tx.send(id) {
            tracing::warn!("outbox worker gone, notification dropped: {}", e);
        }
    }
}

/// The outbox: a dispatcher handle plus the receiving end the worker
/// drains.
pub struct Outbox {
    rx: flume::Receiver<String>,
}

impl Outbox {
    /// Create a dispatcher/outbox pair.
    pub fn new() -> (OutboxDispatcher, Outbox) {
        let (tx, rx) = flume::unbounded();
        (OutboxDispatcher { tx }, Outbox { rx })
    }

    /// Drain notifications until shutdown, delivering each to `sink`
    /// with bounded retries.
    pub async fn run<S: NotificationSink>(self, sink: S, mut shutdown_rx: watch::Receiver<()>) {
        loop {
            tokio::select! {
                msg = self.rx.recv_async() => {
                    match msg {
                        Ok(id) => deliver(&sink, &id).await,
                        // All dispatchers dropped
                        Err(_) => break,
                    }
                }
                _ = shutdown_rx.changed() => {
                    // Flush whatever is already queued before exiting
                    while let Ok(id) = self.rx.try_recv() {
                        deliver(&sink, &id).await;
                    }
                    break;
                }
            }
        }
        tracing::debug!("outbox worker stopped");
    }
}

async fn deliver<S: NotificationSink>(sink: &S, id: &str) {
    for attempt in 1..=DELIVERY_ATTEMPTS {
        match sink.notify(id).await {
            Ok(()) => return,
            Err(e) if attempt < DELIVERY_ATTEMPTS => {
                tracing::warn!(id, attempt, "notification delivery failed, retrying: {}", e);
                tokio::time::sleep(RETRY_DELAY).await;
            }
            Err(e) => {
                tracing::error!(id, "notification delivery failed, giving up: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct RecordingSink {
        delivered: Arc<Mutex<Vec<String>>>,
        failures_left: Arc<AtomicU32>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn notify(&self, id: &str) -> anyhow::Result<()> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                anyhow::bail!("transient sink failure");
            }
            self.delivered.lock().unwrap().push(id.to_string());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_and_deliver() {
        let (dispatcher, outbox) = Outbox::new();
        let sink = RecordingSink::default();
        let delivered = sink.delivered.clone();
        let (shutdown_tx, shutdown_rx) = watch::channel(());

        let worker = tokio::spawn(outbox.run(sink, shutdown_rx));

        dispatcher.dispatch("users/abc");
        dispatcher.dispatch("users/def");
        tokio::task::yield_now().await;

        let _ = shutdown_tx.send(());
        worker.await.unwrap();

        assert_eq!(
            delivered.lock().unwrap().as_slice(),
            ["users/abc", "users/def"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_on_transient_failure() {
        let (dispatcher, outbox) = Outbox::new();
        let sink = RecordingSink::default();
        sink.failures_left.store(1, Ordering::SeqCst);
        let delivered = sink.delivered.clone();
        let (shutdown_tx, shutdown_rx) = watch::channel(());

        let worker = tokio::spawn(outbox.run(sink, shutdown_rx));

        dispatcher.dispatch("users/abc");
        // Let the worker hit the failure and the retry timer
        tokio::time::sleep(Duration::from_secs(1)).await;

        let _ = shutdown_tx.send(());
        worker.await.unwrap();

        assert_eq!(delivered.lock().unwrap().as_slice(), ["users/abc"]);
    }
}
