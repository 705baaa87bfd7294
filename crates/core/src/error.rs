use thiserror::Error;

/// Rejection of a malformed tracking event at the decode boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("{0} cannot be null or blank")]
    Blank(&'static str),

    #[error("invalid tracking payload: {0}")]
    Payload(String),
}
