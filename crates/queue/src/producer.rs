//! SQS publisher for the outbound alerts queue.

use aws_sdk_sqs::Client;
use tracing::{debug, info};

use watchpost_core::config::{AwsConfig, QueueConfig};
use watchpost_core::Alert;
use watchpost_notify::{AlertPublisher, NotifyError};

use crate::error::QueueError;
use crate::sqs::build_client;

/// Sends each alert as one JSON message to the alerts queue.
///
/// One `SendMessage` call per alert; failures are returned to the
/// dispatcher, which logs and drops them.
pub struct SqsAlertPublisher {
    client: Client,
    queue_url: String,
}

impl SqsAlertPublisher {
    pub fn new(aws: &AwsConfig, queue: &QueueConfig) -> Result<Self, QueueError> {
        if queue.alerts_queue_url.is_empty() {
            return Err(QueueError::NotFound(
                "ALERTS_QUEUE_URL is not configured".to_string(),
            ));
        }

        info!(queue_url = %queue.alerts_queue_url, "SQS alert publisher initialized");

        Ok(Self {
            client: build_client(aws),
            queue_url: queue.alerts_queue_url.clone(),
        })
    }
}

#[async_trait::async_trait]
impl AlertPublisher for SqsAlertPublisher {
    async fn publish(&self, alert: &Alert) -> Result<(), NotifyError> {
        let body = serde_json::to_string(alert)?;

        let resp = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(format!("SQS send failed: {e:?}")))?;

        debug!(
            message_id = resp.message_id().unwrap_or("unknown"),
            alert_type = %alert.alert_type,
            "Alert sent to queue"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "sqs"
    }
}
