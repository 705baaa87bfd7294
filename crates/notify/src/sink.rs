//! Fire-and-forget alert sink backed by a bounded channel.
//!
//! The rule engine calls [`AlertSink::send`] synchronously on its hot path.
//! `BufferedSink` only enqueues; a background task drains the buffer and
//! runs the [`Dispatcher`]. A full or closed buffer drops the alert with a
//! warning. Publish failures are logged by the dispatcher and discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use watchpost_core::Alert;

use crate::dispatcher::Dispatcher;
use crate::traits::AlertSink;

/// Counters reported by the drain task when it exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Alerts taken off the buffer and dispatched.
    pub dispatched: u64,
    /// Channel deliveries that failed and were discarded.
    pub failed_deliveries: u64,
}

/// [`AlertSink`] that hands alerts to a background dispatch task.
pub struct BufferedSink {
    tx: mpsc::Sender<Alert>,
    dropped: Arc<AtomicU64>,
}

impl BufferedSink {
    /// Spawn the drain task on the current tokio runtime.
    ///
    /// The task ends once every clone of the returned sink is dropped and
    /// the buffer is empty, yielding its [`SinkStats`].
    pub fn spawn(dispatcher: Dispatcher, capacity: usize) -> (Self, JoinHandle<SinkStats>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(drain(rx, dispatcher));
        let sink = Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (sink, handle)
    }

    /// Alerts discarded because the buffer was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl AlertSink for BufferedSink {
    fn send(&self, alert: Alert) {
        if let Err(e) = self.tx.try_send(alert) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            let (reason, alert) = match e {
                mpsc::error::TrySendError::Full(a) => ("buffer full", a),
                mpsc::error::TrySendError::Closed(a) => ("dispatcher stopped", a),
            };
            warn!(
                alert_type = %alert.alert_type,
                camera_id = %alert.camera_id,
                reason,
                "Alert dropped before dispatch"
            );
        }
    }
}

async fn drain(mut rx: mpsc::Receiver<Alert>, dispatcher: Dispatcher) -> SinkStats {
    let mut stats = SinkStats::default();

    info!(channels = dispatcher.channel_count(), "Alert dispatch task started");

    while let Some(alert) = rx.recv().await {
        let results = dispatcher.dispatch(&alert).await;
        stats.dispatched += 1;
        stats.failed_deliveries += results.iter().filter(|r| !r.success).count() as u64;
    }

    info!(
        dispatched = stats.dispatched,
        failed = stats.failed_deliveries,
        "Alert dispatch task stopped"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::tests::{sample_alert, MockPublisher};

    #[tokio::test]
    async fn send_delivers_in_background() {
        let publisher = MockPublisher::new("mock", false);
        let sent = publisher.sent.clone();
        let (sink, handle) = BufferedSink::spawn(Dispatcher::new(vec![Box::new(publisher)]), 8);

        sink.send(sample_alert());
        sink.send(sample_alert());
        drop(sink);

        let stats = handle.await.unwrap();
        assert_eq!(stats.dispatched, 2);
        assert_eq!(stats.failed_deliveries, 0);
        assert_eq!(sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn publish_failure_is_swallowed() {
        let publisher = MockPublisher::new("down", true);
        let attempts = publisher.attempts.clone();
        let (sink, handle) = BufferedSink::spawn(Dispatcher::new(vec![Box::new(publisher)]), 8);

        // must return normally even though the transport fails
        sink.send(sample_alert());
        drop(sink);

        let stats = handle.await.unwrap();
        assert_eq!(stats.dispatched, 1);
        assert_eq!(stats.failed_deliveries, 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn full_buffer_drops_instead_of_blocking() {
        let (sink, handle) = BufferedSink::spawn(Dispatcher::empty(), 1);

        // current_thread runtime: the drain task cannot run until we yield
        sink.send(sample_alert());
        sink.send(sample_alert());
        sink.send(sample_alert());
        assert_eq!(sink.dropped(), 2);

        drop(sink);
        assert_eq!(handle.await.unwrap().dispatched, 1);
    }

    #[tokio::test]
    async fn sink_usable_through_arc() {
        let (sink, handle) = BufferedSink::spawn(Dispatcher::empty(), 4);
        let shared: Arc<dyn AlertSink> = Arc::new(sink);
        shared.send(sample_alert());
        drop(shared);
        assert_eq!(handle.await.unwrap().dispatched, 1);
    }
}
