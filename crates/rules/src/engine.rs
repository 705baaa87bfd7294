//! Rule engine: evaluates every rule against each event and emits alerts.
//!
//! Per event, in order:
//! 1. cache the frame's evidence URL, if it has one
//! 2. weapon rule
//! 3. sustained-gaze rule (state machine)
//! 4. rapid-approach rule over the window the caller just recorded
//!
//! Each firing rule produces one critical alert. Its `snapshotUrl` is the
//! event's own evidence when present, else the last evidence cached for
//! the detection id.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tracing::{debug, trace, warn};

use watchpost_core::config::EngineConfig;
use watchpost_core::{Alert, TrackingEvent};
use watchpost_notify::AlertSink;

use crate::evaluators::gaze::{self, GazeState, GazeTransition};
use crate::evaluators::{approach, weapon, Finding};
use crate::history::{DepthWindow, HistoryStore};

/// Mutable rule state for one detection id.
#[derive(Debug, Clone)]
struct RuleState {
    gaze: GazeState,
    cached_evidence: Option<String>,
    last_seen: Instant,
}

impl RuleState {
    fn new(now: Instant) -> Self {
        Self {
            gaze: GazeState::Idle,
            cached_evidence: None,
            last_seen: now,
        }
    }
}

/// Stateful evaluator for the weapon, gaze, and approach rules.
pub struct RuleEngine {
    config: EngineConfig,
    history: Arc<HistoryStore>,
    states: DashMap<String, RuleState>,
    sink: Arc<dyn AlertSink>,
}

impl RuleEngine {
    pub fn new(config: EngineConfig, history: Arc<HistoryStore>, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            config,
            history,
            states: DashMap::new(),
            sink,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run all rules for `event` and send every resulting alert to the sink.
    ///
    /// `window` must be the depth window returned by recording this same
    /// event in the history store. Returns the alerts that were sent.
    pub fn analyze(&self, event: &TrackingEvent, window: &DepthWindow) -> Vec<Alert> {
        self.analyze_at(event, window, Instant::now())
    }

    /// [`analyze`](Self::analyze) with an explicit clock reading.
    pub fn analyze_at(&self, event: &TrackingEvent, window: &DepthWindow, now: Instant) -> Vec<Alert> {
        let id = event.detection_id();
        trace!(detection_id = id, "Analyzing tracking event");

        let mut alerts = Vec::new();
        let mut approach_fired = false;

        {
            // Shard lock held for the whole read-modify-write of this id.
            let mut state = self
                .states
                .entry(id.to_string())
                .or_insert_with(|| RuleState::new(now));
            state.last_seen = now;

            if let Some(url) = event.evidence_url() {
                state.cached_evidence = Some(url.to_string());
                debug!(detection_id = id, "Evidence cached");
            }

            if let Some(finding) = weapon::check(event) {
                warn!(
                    detection_id = id,
                    camera_id = event.camera_id(),
                    weapon = event.weapon_type().unwrap_or("unknown"),
                    "Weapon detected"
                );
                alerts.push(assemble(event, finding, &state.cached_evidence));
            }

            let (next, transition) = state.gaze.step(event.is_facing_camera(), self.config.stare_threshold);
            state.gaze = next;
            if transition == GazeTransition::Confirmed {
                warn!(detection_id = id, camera_id = event.camera_id(), "Sustained gaze detected");
                let finding = gaze::finding(self.config.stare_duration_secs());
                alerts.push(assemble(event, finding, &state.cached_evidence));
                // evidence consumed by this alert
                state.cached_evidence = None;
            }

            if let Some(finding) = approach::check(window, self.config.proximity_difference) {
                warn!(detection_id = id, camera_id = event.camera_id(), "Rapid approach detected");
                alerts.push(assemble(event, finding, &state.cached_evidence));
                state.cached_evidence = None;
                approach_fired = true;
            }
        }

        if approach_fired {
            // Start a fresh window so the same approach cannot re-trigger.
            self.history.clear(id);
        }

        for alert in &alerts {
            self.sink.send(alert.clone());
        }
        alerts
    }

    /// Current gaze streak for `detection_id` (0 if unknown).
    pub fn stare_streak(&self, detection_id: &str) -> u32 {
        self.states
            .get(detection_id)
            .map(|s| s.gaze.streak())
            .unwrap_or(0)
    }

    /// Evidence URL currently cached for `detection_id`.
    pub fn cached_evidence(&self, detection_id: &str) -> Option<String> {
        self.states
            .get(detection_id)
            .and_then(|s| s.cached_evidence.clone())
    }

    /// Drop the gaze streak and cached evidence for `detection_id`.
    pub fn forget(&self, detection_id: &str) {
        self.states.remove(detection_id);
    }

    /// Remove state for ids not analyzed since `cutoff`; returns removed ids.
    pub fn evict_idle(&self, cutoff: Instant) -> Vec<String> {
        let mut removed = Vec::new();
        self.states.retain(|id, state| {
            let keep = state.last_seen >= cutoff;
            if !keep {
                removed.push(id.clone());
            }
            keep
        });
        removed
    }

    /// Number of ids with live rule state.
    pub fn tracked(&self) -> usize {
        self.states.len()
    }
}

/// Turn a finding into a critical alert, resolving evidence event-first.
fn assemble(event: &TrackingEvent, finding: Finding, cached: &Option<String>) -> Alert {
    let evidence = event
        .evidence_url()
        .map(str::to_string)
        .or_else(|| cached.clone());

    if event.evidence_url().is_none() {
        if let Some(url) = &evidence {
            debug!(
                detection_id = event.detection_id(),
                rule = %finding.rule,
                url = %url,
                "Attached cached evidence to alert"
            );
        }
    }

    Alert::critical(event, finding.alert_type, finding.description, evidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use watchpost_core::Severity;

    #[derive(Default)]
    struct RecordingSink {
        alerts: Mutex<Vec<Alert>>,
    }

    impl AlertSink for RecordingSink {
        fn send(&self, alert: Alert) {
            self.alerts.lock().unwrap().push(alert);
        }
    }

    struct Harness {
        history: Arc<HistoryStore>,
        engine: RuleEngine,
        sink: Arc<RecordingSink>,
    }

    impl Harness {
        fn new() -> Self {
            let history = Arc::new(HistoryStore::default());
            let sink = Arc::new(RecordingSink::default());
            let engine = RuleEngine::new(EngineConfig::default(), history.clone(), sink.clone());
            Self { history, engine, sink }
        }

        fn feed(&self, event: &TrackingEvent) -> Vec<Alert> {
            let window = self.history.record(event);
            self.engine.analyze(event, &window)
        }

        fn sent(&self) -> Vec<Alert> {
            self.sink.alerts.lock().unwrap().clone()
        }
    }

    fn frame(id: &str) -> TrackingEvent {
        TrackingEvent::new(id, "user-1", "CAM-1").unwrap()
    }

    #[test]
    fn every_weapon_frame_alerts() {
        let h = Harness::new();
        for _ in 0..3 {
            let alerts = h.feed(&frame("d-1").with_weapon("KNIFE", "HAND"));
            assert_eq!(alerts.len(), 1);
            assert_eq!(alerts[0].alert_type, "KNIFE_DETECTED");
            assert_eq!(alerts[0].severity, Severity::Critical);
        }
        assert_eq!(h.sent().len(), 3);
    }

    #[test]
    fn gaze_fires_on_tenth_consecutive_frame() {
        let h = Harness::new();
        for i in 1..=9 {
            assert!(h.feed(&frame("d-1").with_gaze(true, None)).is_empty());
            assert_eq!(h.engine.stare_streak("d-1"), i);
        }

        let alerts = h.feed(&frame("d-1").with_gaze(true, None));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, "SUSTAINED_GAZE");
        assert!(alerts[0].description.contains("5.0"));
        assert_eq!(h.engine.stare_streak("d-1"), 0);

        h.feed(&frame("d-1").with_gaze(true, None));
        assert_eq!(h.engine.stare_streak("d-1"), 1);
    }

    #[test]
    fn gaze_consumes_cached_evidence() {
        let h = Harness::new();
        h.feed(&frame("d-1").with_gaze(true, None).with_evidence("http://e/1.jpg"));
        for _ in 0..8 {
            h.feed(&frame("d-1").with_gaze(true, None));
        }
        let alerts = h.feed(&frame("d-1").with_gaze(true, None));
        assert_eq!(alerts[0].evidence_url.as_deref(), Some("http://e/1.jpg"));
        assert!(h.engine.cached_evidence("d-1").is_none());
    }

    #[test]
    fn event_evidence_beats_cache() {
        let h = Harness::new();
        h.feed(&frame("d-1").with_evidence("http://e/old.jpg"));
        let alerts = h.feed(&frame("d-1").with_weapon("GUN", "WAIST").with_evidence("http://e/new.jpg"));
        assert_eq!(alerts[0].evidence_url.as_deref(), Some("http://e/new.jpg"));
        assert_eq!(h.engine.cached_evidence("d-1").as_deref(), Some("http://e/new.jpg"));
    }

    #[test]
    fn evidence_is_per_detection() {
        let h = Harness::new();
        h.feed(&frame("d-1").with_evidence("http://e/d1.jpg"));
        let alerts = h.feed(&frame("d-2").with_weapon("GUN", "HAND"));
        assert!(alerts[0].evidence_url.is_none());
    }

    #[test]
    fn approach_fires_and_clears_window() {
        let h = Harness::new();
        for depth in [10, 11, 12, 15, 18, 20, 25, 30, 35] {
            assert!(h.feed(&frame("d-1").with_depth(depth)).is_empty());
        }

        let alerts = h.feed(&frame("d-1").with_depth(40));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, "RAPID_APPROACH");
        assert!(h.history.depths("d-1").is_empty());

        // next frame starts a new window and cannot re-fire
        assert!(h.feed(&frame("d-1").with_depth(41)).is_empty());
        assert_eq!(h.history.depths("d-1"), vec![41]);
    }

    #[test]
    fn slow_approach_never_fires() {
        let h = Harness::new();
        for depth in 11..=20 {
            assert!(h.feed(&frame("d-1").with_depth(depth)).is_empty());
        }
        assert_eq!(h.history.depths("d-1").len(), 10);
    }

    #[test]
    fn rules_fire_independently_on_one_frame() {
        let h = Harness::new();
        for depth in [0, 1, 2, 3, 4, 5, 6, 7, 8] {
            h.feed(&frame("d-1").with_gaze(true, None).with_depth(depth));
        }
        let alerts = h.feed(
            &frame("d-1")
                .with_gaze(true, None)
                .with_depth(50)
                .with_weapon("KNIFE", "HAND"),
        );
        let types: Vec<_> = alerts.iter().map(|a| a.alert_type.as_str()).collect();
        assert_eq!(types, vec!["KNIFE_DETECTED", "SUSTAINED_GAZE", "RAPID_APPROACH"]);
        assert_eq!(h.sent().len(), 3);
    }

    #[test]
    fn location_passes_through() {
        let h = Harness::new();
        let alerts = h.feed(&frame("d-1").with_weapon("KNIFE", "HAND").with_location(-27.59, -48.54));
        assert_eq!(alerts[0].latitude, Some(-27.59));
        assert_eq!(alerts[0].longitude, Some(-48.54));
        assert_eq!(alerts[0].subject_id, "user-1");
        assert_eq!(alerts[0].camera_id, "CAM-1");
        assert!(alerts[0].address.is_none());
    }

    #[test]
    fn evict_idle_and_forget_drop_state() {
        let h = Harness::new();
        let start = Instant::now();
        let e1 = frame("old").with_gaze(true, None);
        let e2 = frame("new").with_gaze(true, None);
        h.engine.analyze_at(&e1, &h.history.record(&e1), start);
        h.engine
            .analyze_at(&e2, &h.history.record(&e2), start + std::time::Duration::from_secs(10));

        assert_eq!(h.engine.evict_idle(start + std::time::Duration::from_secs(5)), vec!["old"]);
        assert_eq!(h.engine.stare_streak("old"), 0);
        assert_eq!(h.engine.stare_streak("new"), 1);

        h.engine.forget("new");
        assert_eq!(h.engine.tracked(), 0);
    }
}
