use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::TrackingEvent;

/// Risk level attached to an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A confirmed threat, ready for persistence and notification downstream.
///
/// Field names follow the alert service's JSON contract: the subject is
/// `userId` and the evidence link is `snapshotUrl`. Optionals serialize
/// as `null` rather than being skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "userId", alias = "subjectId")]
    pub subject_id: String,
    pub alert_type: String,
    pub description: String,
    pub severity: Severity,
    pub camera_id: String,
    #[serde(rename = "snapshotUrl", alias = "evidenceUrl")]
    pub evidence_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Filled in by downstream reverse geocoding, never by this engine.
    #[serde(default)]
    pub address: Option<String>,
}

impl Alert {
    /// Build a critical alert for `event`, copying owner, camera and location.
    pub fn critical(
        event: &TrackingEvent,
        alert_type: impl Into<String>,
        description: impl Into<String>,
        evidence_url: Option<String>,
    ) -> Self {
        Self {
            subject_id: event.subject_id().to_string(),
            alert_type: alert_type.into(),
            description: description.into(),
            severity: Severity::Critical,
            camera_id: event.camera_id().to_string(),
            evidence_url,
            latitude: event.latitude(),
            longitude: event.longitude(),
            address: None,
        }
    }

    /// Connectivity test alert sent through a publisher without any tracking input.
    pub fn manual_trigger(subject_id: impl Into<String>, camera_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            alert_type: "MANUAL_TRIGGER".to_string(),
            description: "Manual test alert triggered by an operator.".to_string(),
            severity: Severity::Critical,
            camera_id: camera_id.into(),
            evidence_url: None,
            latitude: None,
            longitude: None,
            address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_and_nulls() {
        let event = TrackingEvent::new("d-1", "user-9", "CAM-3")
            .unwrap()
            .with_location(-27.5, -48.5);
        let alert = Alert::critical(&event, "KNIFE_DETECTED", "knife in hand", None);
        let json: serde_json::Value = serde_json::to_value(&alert).unwrap();

        assert_eq!(json["userId"], "user-9");
        assert_eq!(json["alertType"], "KNIFE_DETECTED");
        assert_eq!(json["severity"], "CRITICAL");
        assert_eq!(json["cameraId"], "CAM-3");
        assert!(json["snapshotUrl"].is_null());
        assert!(json["address"].is_null());
        assert_eq!(json["latitude"], -27.5);
        assert_eq!(json.as_object().unwrap().len(), 9);
    }

    #[test]
    fn severity_display_matches_wire() {
        assert_eq!(Severity::Critical.to_string(), "CRITICAL");
        assert_eq!(
            serde_json::to_string(&Severity::Warning).unwrap(),
            "\"WARNING\""
        );
    }

    #[test]
    fn manual_trigger_has_no_evidence() {
        let alert = Alert::manual_trigger("superadmin", "CAM-TEST-00");
        assert_eq!(alert.alert_type, "MANUAL_TRIGGER");
        assert_eq!(alert.severity, Severity::Critical);
        assert!(alert.evidence_url.is_none());
    }
}
