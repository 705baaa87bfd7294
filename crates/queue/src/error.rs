//! Queue error types.

use thiserror::Error;
use watchpost_core::EventError;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("message parse error: {0}")]
    Parse(String),

    #[error("invalid tracking event: {0}")]
    Invalid(#[from] EventError),

    #[error("acknowledge error: {0}")]
    Ack(String),

    #[error("queue not found: {0}")]
    NotFound(String),
}
