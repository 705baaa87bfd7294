//! Zero-tolerance weapon rule: every frame reporting a weapon alerts.

use watchpost_core::TrackingEvent;

use super::{Finding, RuleKind};

/// Alert-type prefix when the detector did not label the weapon.
const UNLABELLED: &str = "UNKNOWN_WEAPON";

/// Fires on every event with `has_weapon` set. No counter, no cooldown.
pub fn check(event: &TrackingEvent) -> Option<Finding> {
    if !event.has_weapon() {
        return None;
    }

    let label = event
        .weapon_type()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let location = event
        .weapon_location()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or("unknown location");

    let alert_type = format!("{}_DETECTED", alert_label(label.unwrap_or(UNLABELLED)));
    let description = format!("{} detected at {}.", label.unwrap_or("Weapon"), location);

    Some(Finding {
        rule: RuleKind::Weapon,
        alert_type,
        description,
    })
}

/// `"hand gun"` → `"HAND_GUN"`.
fn alert_label(weapon_type: &str) -> String {
    weapon_type
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> TrackingEvent {
        TrackingEvent::new("d-1", "u-1", "CAM").unwrap()
    }

    #[test]
    fn no_weapon_no_finding() {
        assert!(check(&event()).is_none());
    }

    #[test]
    fn finding_names_type_and_location() {
        let finding = check(&event().with_weapon("knife", "HAND")).unwrap();
        assert_eq!(finding.rule, RuleKind::Weapon);
        assert_eq!(finding.alert_type, "KNIFE_DETECTED");
        assert!(finding.description.contains("knife"));
        assert!(finding.description.contains("HAND"));
    }

    #[test]
    fn multi_word_type_becomes_one_label() {
        let finding = check(&event().with_weapon("hand gun", "WAIST")).unwrap();
        assert_eq!(finding.alert_type, "HAND_GUN_DETECTED");
    }

    #[test]
    fn unlabelled_weapon_still_fires() {
        let finding = check(&event().with_weapon("", "")).unwrap();
        assert_eq!(finding.alert_type, "UNKNOWN_WEAPON_DETECTED");
        assert!(finding.description.contains("unknown location"));
    }
}
