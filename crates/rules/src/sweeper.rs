//! Background eviction of per-detection state for ids that went quiet.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::coordinator::IngestionCoordinator;

/// Spawn a task that calls [`IngestionCoordinator::evict_idle`] every
/// `every`, dropping ids idle for longer than `ttl`.
///
/// Runs until a shutdown signal arrives on `shutdown_rx` (or its sender is
/// dropped).
pub fn spawn_idle_sweeper(
    coordinator: Arc<IngestionCoordinator>,
    ttl: Duration,
    every: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    info!(
        ttl_secs = ttl.as_secs(),
        interval_secs = every.as_secs(),
        "Starting idle state sweeper"
    );

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(Duration::from_millis(1)));
        // first tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    debug!("Idle sweeper received shutdown signal");
                    break;
                }

                _ = interval.tick() => {
                    let evicted = coordinator.evict_idle(Instant::now(), ttl);
                    debug!(
                        evicted,
                        live = coordinator.history().len(),
                        "Idle sweep complete"
                    );
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchpost_core::config::EngineConfig;
    use watchpost_core::{Alert, TrackingEvent};
    use watchpost_notify::AlertSink;

    struct NullSink;

    impl AlertSink for NullSink {
        fn send(&self, _alert: Alert) {}
    }

    #[tokio::test]
    async fn sweeper_evicts_and_stops_on_shutdown() {
        let coord = Arc::new(IngestionCoordinator::new(&EngineConfig::default(), Arc::new(NullSink)));
        let event = TrackingEvent::new("d-1", "user-1", "CAM-1").unwrap().with_depth(3);
        coord.process(Some(&event));
        assert_eq!(coord.history().len(), 1);

        let (tx, rx) = broadcast::channel(1);
        let handle = spawn_idle_sweeper(
            coord.clone(),
            Duration::from_millis(10),
            Duration::from_millis(20),
            rx,
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(coord.history().is_empty());
        assert_eq!(coord.engine().tracked(), 0);

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
