//! Ingestion coordinator: entry point for every tracking event.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use watchpost_core::config::EngineConfig;
use watchpost_core::{Alert, TrackingEvent};
use watchpost_notify::AlertSink;

use crate::engine::RuleEngine;
use crate::history::HistoryStore;

/// Records each event into the history store, then hands it to the engine.
///
/// Owns the only [`HistoryStore`] and [`RuleEngine`] for a process. Safe to
/// share behind an `Arc` across worker tasks.
pub struct IngestionCoordinator {
    history: Arc<HistoryStore>,
    engine: RuleEngine,
}

impl IngestionCoordinator {
    pub fn new(config: &EngineConfig, sink: Arc<dyn AlertSink>) -> Self {
        let history = Arc::new(HistoryStore::new(config.history_window));
        let engine = RuleEngine::new(config.clone(), history.clone(), sink);
        Self { history, engine }
    }

    /// Process one event. `None` is logged and skipped without touching state.
    pub fn process(&self, event: Option<&TrackingEvent>) -> Vec<Alert> {
        self.process_at(event, Instant::now())
    }

    /// [`process`](Self::process) with an explicit clock reading.
    pub fn process_at(&self, event: Option<&TrackingEvent>, now: Instant) -> Vec<Alert> {
        let Some(event) = event else {
            debug!("Skipping empty tracking event");
            return Vec::new();
        };

        let window = self.history.record_at(event, now);
        self.engine.analyze_at(event, &window, now)
    }

    /// Drop all state for ids idle longer than `ttl`; returns how many ids went.
    pub fn evict_idle(&self, now: Instant, ttl: Duration) -> usize {
        let Some(cutoff) = now.checked_sub(ttl) else {
            return 0;
        };

        let mut removed = self.history.evict_idle(cutoff);
        removed.extend(self.engine.evict_idle(cutoff));
        removed.sort_unstable();
        removed.dedup();

        if !removed.is_empty() {
            info!(evicted = removed.len(), "Evicted idle detections");
        }
        removed.len()
    }

    /// Drop all state for `detection_id` immediately.
    pub fn forget(&self, detection_id: &str) {
        self.history.clear(detection_id);
        self.engine.forget(detection_id);
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }
}
