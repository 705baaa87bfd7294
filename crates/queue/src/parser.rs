//! Decode queue message bodies into validated [`TrackingEvent`]s.

use watchpost_core::{EventError, TrackingEvent};

use crate::consumer::QueueMessage;
use crate::error::QueueError;

/// Decode a single queue message body into a [`TrackingEvent`].
///
/// Blank or null ids surface as [`QueueError::Invalid`]; anything that is
/// not a well-formed tracking payload surfaces as [`QueueError::Parse`].
pub fn parse_message(msg: &QueueMessage) -> Result<TrackingEvent, QueueError> {
    TrackingEvent::from_json(&msg.body).map_err(|e| match e {
        EventError::Payload(detail) => {
            QueueError::Parse(format!("Invalid tracking payload in message {}: {}", msg.id, detail))
        }
        blank @ EventError::Blank(_) => QueueError::Invalid(blank),
    })
}
