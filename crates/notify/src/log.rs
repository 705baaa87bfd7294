//! Publisher that writes alerts to the tracing log.
//!
//! Used for local runs and replays where no broker is configured.

use tracing::info;

use watchpost_core::Alert;

use crate::traits::{AlertPublisher, NotifyError};

#[derive(Debug, Default)]
pub struct LogPublisher;

impl LogPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl AlertPublisher for LogPublisher {
    async fn publish(&self, alert: &Alert) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(alert)?;
        info!(
            alert_type = %alert.alert_type,
            severity = %alert.severity,
            user_id = %alert.subject_id,
            camera_id = %alert.camera_id,
            payload = %payload,
            "ALERT"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}
