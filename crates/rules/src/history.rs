//! Per-detection sliding window of recent depth samples.
//!
//! The store is an explicitly owned object handed to the engine; there is
//! no process-wide state. Each detection id maps to its own window inside a
//! sharded [`DashMap`], so different ids never contend on one lock and the
//! record-then-read step for one id happens under a single shard lock.

use std::collections::VecDeque;
use std::time::Instant;

use dashmap::DashMap;
use tracing::debug;

use watchpost_core::TrackingEvent;

/// Window length used when none is configured.
pub const DEFAULT_WINDOW: usize = 10;

struct Track {
    /// Newest sample at the front.
    depths: VecDeque<i32>,
    last_seen: Instant,
}

/// Snapshot of one id's window taken right after a sample was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthWindow {
    samples: Vec<i32>,
    capacity: usize,
}

impl DepthWindow {
    pub fn new(samples: Vec<i32>, capacity: usize) -> Self {
        Self { samples, capacity }
    }

    /// Samples newest-first.
    pub fn samples(&self) -> &[i32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True once the window holds `capacity` samples.
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    /// Newest minus oldest sample, only when the window is full.
    ///
    /// Widened to `i64` so any pair of `i32` depths subtracts exactly.
    pub fn rise(&self) -> Option<i64> {
        if !self.is_full() {
            return None;
        }
        let newest = *self.samples.first()?;
        let oldest = *self.samples.get(self.capacity - 1)?;
        Some(i64::from(newest) - i64::from(oldest))
    }
}

/// Bounded newest-first depth history keyed by detection id.
pub struct HistoryStore {
    capacity: usize,
    tracks: DashMap<String, Track>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl HistoryStore {
    /// Create a store keeping at most `capacity` samples per id.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tracks: DashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Push the event's depth to the front of its window, evicting the
    /// oldest sample past capacity, and return the updated window.
    pub fn record(&self, event: &TrackingEvent) -> DepthWindow {
        self.record_at(event, Instant::now())
    }

    /// [`record`](Self::record) with an explicit clock reading.
    pub fn record_at(&self, event: &TrackingEvent, now: Instant) -> DepthWindow {
        let mut track = self
            .tracks
            .entry(event.detection_id().to_string())
            .or_insert_with(|| Track {
                depths: VecDeque::with_capacity(self.capacity + 1),
                last_seen: now,
            });

        track.depths.push_front(event.depth_position());
        track.depths.truncate(self.capacity);
        track.last_seen = now;

        DepthWindow::new(track.depths.iter().copied().collect(), self.capacity)
    }

    /// Current window for `detection_id`, newest first. Empty if unknown.
    pub fn depths(&self, detection_id: &str) -> Vec<i32> {
        self.tracks
            .get(detection_id)
            .map(|t| t.depths.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drop all samples for `detection_id`. No-op if unknown.
    pub fn clear(&self, detection_id: &str) {
        if self.tracks.remove(detection_id).is_some() {
            debug!(detection_id, "Cleared depth history");
        }
    }

    /// Remove every window not updated since `cutoff`; returns removed ids.
    pub fn evict_idle(&self, cutoff: Instant) -> Vec<String> {
        let mut removed = Vec::new();
        self.tracks.retain(|id, track| {
            let keep = track.last_seen >= cutoff;
            if !keep {
                removed.push(id.clone());
            }
            keep
        });
        removed
    }

    /// Number of ids with a live window.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn frame(id: &str, depth: i32) -> TrackingEvent {
        TrackingEvent::new(id, "user-1", "CAM-1")
            .unwrap()
            .with_depth(depth)
    }

    #[test]
    fn window_is_bounded_and_newest_first() {
        let store = HistoryStore::default();
        for depth in 1..=25 {
            let window = store.record(&frame("d-1", depth));
            assert!(window.len() <= DEFAULT_WINDOW);
            assert_eq!(window.samples()[0], depth);
            assert_eq!(store.depths("d-1")[0], depth);
        }
        assert_eq!(store.depths("d-1"), (16..=25).rev().collect::<Vec<_>>());
    }

    #[test]
    fn unknown_id_has_empty_window() {
        let store = HistoryStore::default();
        assert!(store.depths("never-seen").is_empty());
    }

    #[test]
    fn clear_is_complete_and_idempotent() {
        let store = HistoryStore::default();
        store.record(&frame("d-1", 5));
        store.record(&frame("d-2", 7));

        store.clear("d-1");
        store.clear("d-1");

        assert!(store.depths("d-1").is_empty());
        assert_eq!(store.depths("d-2"), vec![7]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn rise_requires_full_window() {
        let partial = DepthWindow::new(vec![40, 10], 10);
        assert_eq!(partial.rise(), None);

        let full = DepthWindow::new(vec![40, 35, 30, 25, 20, 18, 15, 12, 11, 10], 10);
        assert!(full.is_full());
        assert_eq!(full.rise(), Some(30));
    }

    #[test]
    fn rise_spans_full_i32_range() {
        let mut samples = vec![i32::MAX];
        samples.extend([0; 8]);
        samples.push(i32::MIN);
        let window = DepthWindow::new(samples, 10);
        assert_eq!(window.rise(), Some(i64::from(i32::MAX) - i64::from(i32::MIN)));

        let mut falling = vec![i32::MIN];
        falling.extend([0; 8]);
        falling.push(i32::MAX);
        assert!(DepthWindow::new(falling, 10).rise().unwrap() < 0);
    }

    #[test]
    fn evict_idle_drops_only_stale_windows() {
        let store = HistoryStore::default();
        let start = Instant::now();
        store.record_at(&frame("stale", 1), start);
        store.record_at(&frame("fresh", 1), start + Duration::from_secs(60));

        let removed = store.evict_idle(start + Duration::from_secs(30));

        assert_eq!(removed, vec!["stale".to_string()]);
        assert!(store.depths("stale").is_empty());
        assert_eq!(store.depths("fresh"), vec![1]);
    }

    #[test]
    fn concurrent_writers_keep_windows_consistent() {
        let store = Arc::new(HistoryStore::default());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for depth in 0..500 {
                        // half the threads share one id
                        let id = if t % 2 == 0 { "shared".to_string() } else { format!("own-{t}") };
                        let window = store.record(&frame(&id, depth));
                        assert!(window.len() <= DEFAULT_WINDOW);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.depths("shared").len(), DEFAULT_WINDOW);
        for t in [1, 3, 5, 7] {
            assert_eq!(store.depths(&format!("own-{t}"))[0], 499);
        }
    }
}
