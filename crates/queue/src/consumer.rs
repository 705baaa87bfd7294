//! Provider-neutral view of the tracking queue.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::QueueError;

/// One undecoded tracking message as received from the queue.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    /// Provider message id; used only for logging.
    pub id: String,
    /// Raw JSON body, expected to be a single tracking event.
    pub body: String,
    /// Token passed back to [`QueueConsumer::ack`].
    pub receipt_handle: String,
    pub sent_at: DateTime<Utc>,
    /// 1 on first delivery.
    pub receive_count: u32,
}

impl QueueMessage {
    /// A first-delivery message sent now.
    pub fn new(
        id: impl Into<String>,
        body: impl Into<String>,
        receipt_handle: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
            receipt_handle: receipt_handle.into(),
            sent_at: Utc::now(),
            receive_count: 1,
        }
    }

    /// True if the queue has handed this message out before.
    pub fn is_redelivery(&self) -> bool {
        self.receive_count > 1
    }
}

/// Snapshot of queue reachability and backlog, logged when a worker starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueHealth {
    pub provider: &'static str,
    /// Approximate visible messages waiting.
    pub backlog: Option<u64>,
    /// Approximate messages parked in the dead-letter queue, when one is
    /// configured.
    pub dead_letters: Option<u64>,
}

fn count(n: Option<u64>) -> String {
    n.map_or_else(|| "unknown".to_string(), |n| n.to_string())
}

impl fmt::Display for QueueHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} backlog={}", self.provider, count(self.backlog))?;
        if let Some(n) = self.dead_letters {
            write!(f, " dead_letters={n}")?;
        }
        Ok(())
    }
}

/// Source of tracking messages.
///
/// The worker loop is generic over this trait; tests drive it with
/// in-memory fakes.
#[async_trait]
pub trait QueueConsumer: Send + Sync {
    /// Receive up to `max_messages`. May long-poll; returns an empty vec
    /// when nothing arrived.
    async fn poll_batch(&self, max_messages: u32) -> Result<Vec<QueueMessage>, QueueError>;

    /// Remove a handled message from the queue.
    async fn ack(&self, receipt_handle: &str) -> Result<(), QueueError>;

    /// Query backlog and dead-letter depth. An error means the queue is
    /// unreachable.
    async fn health_check(&self) -> Result<QueueHealth, QueueError>;
}
