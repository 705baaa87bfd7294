//! Fans alerts out to configured channels.
//!
//! Every alert goes to every channel. Individual channel failures are
//! logged and reported in the results but never block other channels,
//! and nothing is retried.

use watchpost_core::Alert;

use crate::traits::{AlertPublisher, DispatchResult};

/// Delivers each alert to a fixed set of publishers.
pub struct Dispatcher {
    channels: Vec<Box<dyn AlertPublisher>>,
}

impl Dispatcher {
    /// Create a dispatcher over the given channels.
    pub fn new(channels: Vec<Box<dyn AlertPublisher>>) -> Self {
        Self { channels }
    }

    /// Create a dispatcher with no channels; alerts are dropped.
    pub fn empty() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    /// Add another channel.
    pub fn add_channel(&mut self, channel: Box<dyn AlertPublisher>) {
        self.channels.push(channel);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Publish one alert to all channels, once each.
    pub async fn dispatch(&self, alert: &Alert) -> Vec<DispatchResult> {
        if self.channels.is_empty() {
            tracing::debug!(alert_type = %alert.alert_type, "No alert channels configured");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            let start = std::time::Instant::now();
            let result = channel.publish(alert).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, error) = match result {
                Ok(()) => {
                    tracing::info!(
                        alert_type = %alert.alert_type,
                        camera_id = %alert.camera_id,
                        channel = channel.channel_name(),
                        duration_ms,
                        "Alert delivered"
                    );
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(
                        alert_type = %alert.alert_type,
                        camera_id = %alert.camera_id,
                        channel = channel.channel_name(),
                        error = %e,
                        duration_ms,
                        "Alert delivery failed, alert dropped"
                    );
                    (false, Some(e.to_string()))
                }
            };

            results.push(DispatchResult {
                channel: channel.channel_name().to_string(),
                alert_type: alert.alert_type.clone(),
                success,
                error,
                duration_ms,
            });
        }

        results
    }

    /// Send a test alert through the channel at `channel_index`.
    pub async fn test_channel(&self, channel_index: usize) -> Result<(), crate::NotifyError> {
        let channel = self.channels.get(channel_index).ok_or_else(|| {
            crate::NotifyError::Config(format!("Channel index {channel_index} out of range"))
        })?;
        channel.test().await
    }
}
