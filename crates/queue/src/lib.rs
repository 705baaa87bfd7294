pub mod consumer;
pub mod error;
pub mod parser;
pub mod producer;
pub mod sqs;

pub use consumer::{QueueConsumer, QueueHealth, QueueMessage};
pub use error::QueueError;
pub use parser::parse_message;
pub use producer::SqsAlertPublisher;
pub use sqs::SqsConsumer;
