//! Publisher and sink traits plus shared error types.

use std::sync::Arc;

use watchpost_core::Alert;

/// Errors that can occur while publishing an alert.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Alert serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// A channel that delivers alerts to an external system.
#[async_trait::async_trait]
pub trait AlertPublisher: Send + Sync {
    /// Publish one alert. Called at most once per alert per channel.
    async fn publish(&self, alert: &Alert) -> Result<(), NotifyError>;

    /// Test connectivity with a manual-trigger alert.
    async fn test(&self) -> Result<(), NotifyError> {
        let alert = Alert::manual_trigger("superadmin", "CAM-TEST-00");
        self.publish(&alert).await
    }

    /// Human-readable name for this channel (e.g., "log", "sqs").
    fn channel_name(&self) -> &str;
}

/// Where the rule engine hands finished alerts.
///
/// `send` must never fail outward and must not wait on the external
/// channel; delivery problems are the sink's to log and discard.
pub trait AlertSink: Send + Sync {
    fn send(&self, alert: Alert);
}

impl<T: AlertSink + ?Sized> AlertSink for Arc<T> {
    fn send(&self, alert: Alert) {
        (**self).send(alert)
    }
}

/// Result of publishing an alert to a single channel.
#[derive(Debug)]
pub struct DispatchResult {
    pub channel: String,
    pub alert_type: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
