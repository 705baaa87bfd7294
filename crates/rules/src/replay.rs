//! Offline replay of newline-delimited JSON tracking events.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use watchpost_core::TrackingEvent;

use crate::coordinator::IngestionCoordinator;

/// Counters for one replay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub lines: usize,
    pub events: usize,
    pub skipped: usize,
    pub alerts: usize,
}

/// Feed every line of `reader` through `coordinator`.
///
/// Blank lines are ignored. Lines that are not UTF-8 or not a valid
/// tracking event are logged and skipped. A read error ends the replay
/// early; whatever was processed so far is still reported.
pub async fn replay_ndjson<R>(mut reader: R, coordinator: &IngestionCoordinator) -> ReplayStats
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = ReplayStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(line = stats.lines + 1, error = %e, "Replay read failed, stopping");
                break;
            }
        }
        stats.lines += 1;

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                stats.skipped += 1;
                warn!(line = stats.lines, error = %e, "Skipping non-UTF-8 replay line");
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        match TrackingEvent::from_json(line) {
            Ok(event) => {
                stats.events += 1;
                stats.alerts += coordinator.process(Some(&event)).len();
            }
            Err(e) => {
                stats.skipped += 1;
                warn!(line = stats.lines, error = %e, "Skipping bad replay line");
            }
        }
    }

    info!(
        lines = stats.lines,
        events = stats.events,
        skipped = stats.skipped,
        alerts = stats.alerts,
        "Replay finished"
    );
    stats
}
