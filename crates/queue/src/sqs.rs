//! AWS SQS consumer for the tracking-event queue.

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_sqs::config::BehaviorVersion;
use aws_sdk_sqs::types::{MessageSystemAttributeName, QueueAttributeName};
use aws_sdk_sqs::Client;
use chrono::{TimeZone, Utc};
use tracing::{debug, info};

use watchpost_core::config::{AwsConfig, QueueConfig};

use crate::consumer::{QueueConsumer, QueueHealth, QueueMessage};
use crate::error::QueueError;

/// Long-poll wait per receive call; the SQS maximum.
const LONG_POLL_SECS: i32 = 20;

/// Long-polling consumer for tracking events published by vision agents.
pub struct SqsConsumer {
    client: Client,
    queue_url: String,
    dlq_url: Option<String>,
    visibility_timeout_secs: i32,
}

/// Build an SQS client from project config.
///
/// Static credentials are used when both key id and secret are set;
/// otherwise the SDK's default provider chain applies.
pub(crate) fn build_client(aws: &AwsConfig) -> Client {
    let region = aws_sdk_sqs::config::Region::new(aws.region.clone());

    // Build SQS client config directly: aws_config::defaults() would pick up
    // AWS_ENDPOINT_URL, which may point at an unrelated service.
    let mut sqs_config = aws_sdk_sqs::Config::builder()
        .region(region)
        .behavior_version(BehaviorVersion::latest());

    if let (Some(key_id), Some(secret)) = (&aws.access_key_id, &aws.secret_access_key) {
        let creds = Credentials::new(
            key_id,
            secret,
            aws.session_token.clone(),
            None,
            "watchpost-queue-static",
        );
        sqs_config = sqs_config.credentials_provider(creds);
    }

    // Only apply endpoint override if QUEUE_AWS_ENDPOINT_URL is explicitly set.
    if let Some(ref endpoint) = aws.endpoint_url {
        if !endpoint.is_empty() {
            let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                endpoint.clone()
            } else {
                format!("https://{endpoint}")
            };
            sqs_config = sqs_config.endpoint_url(&url);
        }
    }

    Client::from_conf(sqs_config.build())
}

impl SqsConsumer {
    /// Create a consumer for the tracking-event queue.
    pub async fn new(aws: &AwsConfig, queue: &QueueConfig) -> Result<Self, QueueError> {
        if queue.tracking_queue_url.is_empty() {
            return Err(QueueError::NotFound(
                "TRACKING_QUEUE_URL is not configured".to_string(),
            ));
        }

        let client = build_client(aws);

        info!(
            queue_url = %queue.tracking_queue_url,
            region = %aws.region,
            "SQS tracking consumer initialized"
        );

        Ok(Self {
            client,
            queue_url: queue.tracking_queue_url.clone(),
            dlq_url: queue.dlq_url.clone(),
            visibility_timeout_secs: queue.visibility_timeout_secs as i32,
        })
    }

    /// Approximate number of visible messages in `queue_url`.
    async fn approximate_depth(&self, queue_url: &str) -> Result<Option<u64>, QueueError> {
        let resp = self
            .client
            .get_queue_attributes()
            .queue_url(queue_url)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .send()
            .await
            .map_err(|e| QueueError::Connection(format!("SQS attribute lookup failed: {e:?}")))?;

        Ok(resp
            .attributes()
            .and_then(|attrs| attrs.get(&QueueAttributeName::ApproximateNumberOfMessages))
            .and_then(|v| v.parse::<u64>().ok()))
    }
}

/// Convert an SDK message into our provider-neutral [`QueueMessage`].
fn to_queue_message(msg: aws_sdk_sqs::types::Message) -> Result<QueueMessage, QueueError> {
    let attribute = |name: MessageSystemAttributeName| {
        msg.attributes()
            .and_then(|attrs| attrs.get(&name))
            .cloned()
    };

    // SentTimestamp is epoch millis.
    let sent_at = attribute(MessageSystemAttributeName::SentTimestamp)
        .and_then(|ts| ts.parse::<i64>().ok())
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(Utc::now);

    let receive_count = attribute(MessageSystemAttributeName::ApproximateReceiveCount)
        .and_then(|c| c.parse::<u32>().ok())
        .unwrap_or(1);

    let receipt_handle = msg
        .receipt_handle()
        .ok_or_else(|| QueueError::Parse("missing receipt handle".into()))?
        .to_string();

    Ok(QueueMessage {
        id: msg.message_id().unwrap_or("unknown").to_string(),
        body: msg.body().unwrap_or("").to_string(),
        receipt_handle,
        sent_at,
        receive_count,
    })
}

#[async_trait]
impl QueueConsumer for SqsConsumer {
    async fn poll_batch(&self, max_messages: u32) -> Result<Vec<QueueMessage>, QueueError> {
        // SQS caps at 10 messages per request.
        let capped = max_messages.clamp(1, 10) as i32;

        debug!(max_messages = capped, "Polling SQS for tracking events");

        let resp = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(capped)
            .wait_time_seconds(LONG_POLL_SECS)
            .visibility_timeout(self.visibility_timeout_secs)
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .send()
            .await
            .map_err(|e| QueueError::Connection(format!("SQS receive failed: {e:?}")))?;

        let messages = resp
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(to_queue_message)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = messages.len(), "Received SQS messages");
        Ok(messages)
    }

    async fn ack(&self, receipt_handle: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::Ack(format!("SQS delete failed: {e:?}")))?;

        Ok(())
    }

    async fn health_check(&self) -> Result<QueueHealth, QueueError> {
        let backlog = self.approximate_depth(&self.queue_url).await?;
        let dead_letters = match &self.dlq_url {
            Some(url) => self.approximate_depth(url).await?,
            None => None,
        };

        Ok(QueueHealth {
            provider: "sqs",
            backlog,
            dead_letters,
        })
    }
}
