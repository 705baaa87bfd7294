//! Real-time threat detection over per-frame tracking events.
//!
//! An [`IngestionCoordinator`] records each event's depth into the
//! [`HistoryStore`] and hands it to the [`RuleEngine`], which runs the
//! weapon, sustained-gaze, and rapid-approach rules and pushes every
//! confirmed alert into an [`watchpost_notify::AlertSink`].
//!
//! [`worker::run_consumer`] drives a coordinator from a queue,
//! [`replay::replay_ndjson`] drives one from an NDJSON stream, and
//! [`sweeper::spawn_idle_sweeper`] evicts state for detections that went
//! quiet.

pub mod coordinator;
pub mod engine;
pub mod evaluators;
pub mod history;
pub mod replay;
pub mod sweeper;
pub mod worker;

pub use coordinator::IngestionCoordinator;
pub use engine::RuleEngine;
pub use evaluators::{Finding, RuleKind};
pub use history::{DepthWindow, HistoryStore};
pub use replay::{replay_ndjson, ReplayStats};
pub use sweeper::spawn_idle_sweeper;
pub use worker::{check_queue_health, run_consumer, WorkerConfig, WorkerStats};
