//! Queue-driven worker loop: poll → parse → process → ack.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use watchpost_core::config::QueueConfig;
use watchpost_queue::{parse_message, QueueConsumer, QueueHealth, QueueMessage};

use crate::coordinator::IngestionCoordinator;

/// Polling parameters for [`run_consumer`].
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    pub max_batch_size: u32,
    pub poll_interval: Duration,
}

impl From<&QueueConfig> for WorkerConfig {
    fn from(q: &QueueConfig) -> Self {
        Self {
            max_batch_size: q.max_batch_size,
            poll_interval: Duration::from_millis(q.poll_interval_ms),
        }
    }
}

/// Counters returned when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub received: u64,
    pub processed: u64,
    pub rejected: u64,
    pub panicked: u64,
    pub alerts: u64,
}

/// Log queue backlog and dead-letter depth before consuming.
///
/// An unreachable queue is logged and returns `None`; the consumer loop
/// retries on its own, so startup never fails here.
pub async fn check_queue_health<C>(consumer: &C) -> Option<QueueHealth>
where
    C: QueueConsumer + ?Sized,
{
    match consumer.health_check().await {
        Ok(health) => {
            info!(
                provider = health.provider,
                backlog = ?health.backlog,
                dead_letters = ?health.dead_letters,
                "Tracking queue reachable"
            );
            if let Some(n) = health.dead_letters.filter(|n| *n > 0) {
                warn!(dead_letters = n, "Dead-letter queue is not empty");
            }
            Some(health)
        }
        Err(e) => {
            warn!(error = %e, "Tracking queue health check failed");
            None
        }
    }
}

/// Consume tracking events until `shutdown_rx` fires.
///
/// Every received message is acked once handled, including ones that fail
/// to decode or validate; they would fail identically on redelivery.
pub async fn run_consumer<C>(
    consumer: &C,
    coordinator: &IngestionCoordinator,
    config: WorkerConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> WorkerStats
where
    C: QueueConsumer + ?Sized,
{
    let mut stats = WorkerStats::default();

    info!(
        max_batch_size = config.max_batch_size,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        "Tracking consumer started"
    );

    loop {
        let polled = tokio::select! {
            biased;

            _ = shutdown_rx.recv() => {
                info!("Tracking consumer received shutdown signal");
                break;
            }

            polled = consumer.poll_batch(config.max_batch_size) => polled,
        };

        let messages = match polled {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, "Queue poll error, retrying in {:?}", config.poll_interval);
                tokio::time::sleep(config.poll_interval).await;
                continue;
            }
        };

        if messages.is_empty() {
            tokio::time::sleep(config.poll_interval).await;
            continue;
        }

        stats.received += messages.len() as u64;
        for msg in &messages {
            handle_message(consumer, coordinator, msg, &mut stats).await;
        }
    }

    info!(
        received = stats.received,
        processed = stats.processed,
        rejected = stats.rejected,
        panicked = stats.panicked,
        alerts = stats.alerts,
        "Tracking consumer stopped"
    );
    stats
}

async fn handle_message<C>(
    consumer: &C,
    coordinator: &IngestionCoordinator,
    msg: &QueueMessage,
    stats: &mut WorkerStats,
) where
    C: QueueConsumer + ?Sized,
{
    if msg.is_redelivery() {
        debug!(message_id = %msg.id, receive_count = msg.receive_count, "Redelivered tracking message");
    }

    match parse_message(msg) {
        Ok(event) => {
            let outcome = catch_unwind(AssertUnwindSafe(|| coordinator.process(Some(&event))));
            match outcome {
                Ok(alerts) => {
                    stats.processed += 1;
                    stats.alerts += alerts.len() as u64;
                }
                Err(_) => {
                    stats.panicked += 1;
                    error!(
                        message_id = %msg.id,
                        detection_id = event.detection_id(),
                        "Rule evaluation panicked; event dropped"
                    );
                }
            }
        }
        Err(e) => {
            stats.rejected += 1;
            warn!(message_id = %msg.id, error = %e, "Dropping invalid tracking message");
        }
    }

    if let Err(e) = consumer.ack(&msg.receipt_handle).await {
        warn!(message_id = %msg.id, error = %e, "Failed to ack message");
    } else {
        debug!(message_id = %msg.id, "Message acked");
    }
}
