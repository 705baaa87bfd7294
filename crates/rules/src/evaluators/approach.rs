//! Rapid-approach rule over the freshly recorded depth window.

use crate::history::DepthWindow;

use super::{Finding, RuleKind};

/// Fires when a full window shows the subject got at least `min_rise`
/// closer between its oldest and newest sample.
pub fn check(window: &DepthWindow, min_rise: i32) -> Option<Finding> {
    let rise = window.rise()?;
    if rise < i64::from(min_rise) {
        return None;
    }

    Some(Finding {
        rule: RuleKind::RapidApproach,
        alert_type: "RAPID_APPROACH".to_string(),
        description: format!(
            "Subject loitering and closing in fast: proximity rose by {} over the last {} frames.",
            rise,
            window.len()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_when_rise_meets_threshold() {
        let window = DepthWindow::new(vec![40, 35, 30, 25, 20, 18, 15, 12, 11, 10], 10);
        let finding = check(&window, 15).unwrap();
        assert_eq!(finding.alert_type, "RAPID_APPROACH");
        assert!(finding.description.contains("30"));
    }

    #[test]
    fn exact_threshold_fires() {
        let window = DepthWindow::new(vec![25, 0, 0, 0, 0, 0, 0, 0, 0, 10], 10);
        assert!(check(&window, 15).is_some());
    }

    #[test]
    fn slow_drift_does_not_fire() {
        let window = DepthWindow::new((11..=20).rev().collect(), 10);
        assert!(check(&window, 15).is_none());
    }

    #[test]
    fn partial_window_is_skipped() {
        let window = DepthWindow::new(vec![90, 0, 0, 0, 0, 0, 0, 0, 0], 10);
        assert!(check(&window, 15).is_none());
    }

    #[test]
    fn extreme_depths_fire_without_overflow() {
        let mut samples = vec![i32::MAX];
        samples.extend([0; 8]);
        samples.push(-10);
        let finding = check(&DepthWindow::new(samples, 10), 15).unwrap();
        assert!(finding.description.contains("2147483657"));
    }

    #[test]
    fn retreat_does_not_fire() {
        let window = DepthWindow::new((10..=19).collect(), 10);
        assert!(check(&window, 15).is_none());
    }
}
