//! Alert sink for confirmed threat alerts.
//!
//! This crate provides:
//! - `AlertPublisher` trait for pluggable delivery channels
//! - `LogPublisher`, the structured-log channel
//! - `Dispatcher` that fans an alert out to every configured channel
//! - `BufferedSink`, the fire-and-forget `AlertSink` the rule engine writes to

pub mod dispatcher;
pub mod log;
pub mod sink;
pub mod traits;

pub use dispatcher::Dispatcher;
pub use log::LogPublisher;
pub use sink::{BufferedSink, SinkStats};
pub use traits::{AlertPublisher, AlertSink, DispatchResult, NotifyError};
