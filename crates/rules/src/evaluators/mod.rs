//! The three detection rules.
//!
//! Weapon and approach are plain predicates over the current event or the
//! freshly recorded depth window. Only the gaze rule carries state, modelled
//! as an explicit state machine in [`gaze`].

pub mod approach;
pub mod gaze;
pub mod weapon;

use std::fmt;

/// Which rule produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Weapon,
    SustainedGaze,
    RapidApproach,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::Weapon => write!(f, "weapon"),
            RuleKind::SustainedGaze => write!(f, "sustained-gaze"),
            RuleKind::RapidApproach => write!(f, "rapid-approach"),
        }
    }
}

/// A rule's positive verdict, before evidence resolution turns it into an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub rule: RuleKind,
    pub alert_type: String,
    pub description: String,
}
