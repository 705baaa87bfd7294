//! Sustained-gaze state machine.
//!
//! Idle → Accumulating { streak } → (threshold reached) fire and back to Idle.
//! Any frame not facing the camera returns to Idle immediately, whatever the
//! streak; there is no partial credit.

use super::{Finding, RuleKind};

/// Per-detection gaze state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GazeState {
    /// No facing frames in the current run.
    #[default]
    Idle,
    /// `streak` consecutive facing frames, below the threshold.
    Accumulating { streak: u32 },
}

/// What a single frame did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GazeTransition {
    /// Streak broken (or never started).
    Reset,
    /// Streak extended to the given length.
    Advanced(u32),
    /// Threshold reached; an alert is due and the streak restarts.
    Confirmed,
}

impl GazeState {
    /// Current consecutive facing-frame count.
    pub fn streak(&self) -> u32 {
        match self {
            GazeState::Idle => 0,
            GazeState::Accumulating { streak } => *streak,
        }
    }

    /// Apply one frame and return the next state with the transition taken.
    ///
    /// | state                  | facing | next                       | transition   |
    /// |------------------------|--------|----------------------------|--------------|
    /// | any                    | false  | Idle                       | Reset        |
    /// | Idle / Accumulating(n) | true   | Accumulating(n+1)          | Advanced     |
    /// | Idle / Accumulating(n) | true, n+1 ≥ threshold | Idle        | Confirmed    |
    pub fn step(self, facing: bool, threshold: u32) -> (GazeState, GazeTransition) {
        if !facing {
            return (GazeState::Idle, GazeTransition::Reset);
        }

        let streak = self.streak().saturating_add(1);
        if streak >= threshold.max(1) {
            (GazeState::Idle, GazeTransition::Confirmed)
        } else {
            (GazeState::Accumulating { streak }, GazeTransition::Advanced(streak))
        }
    }
}

/// Finding emitted on [`GazeTransition::Confirmed`].
pub fn finding(duration_secs: f64) -> Finding {
    Finding {
        rule: RuleKind::SustainedGaze,
        alert_type: "SUSTAINED_GAZE".to_string(),
        description: format!("Subject watched you for {duration_secs:.1} seconds."),
    }
}
