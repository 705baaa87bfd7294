use serde::{Deserialize, Serialize};

use crate::error::EventError;

/// One frame of object-tracking telemetry emitted by a vision agent.
///
/// Always holds a non-blank `detection_id` and `subject_id`: both
/// [`TrackingEvent::new`] and JSON decoding reject anything else, so rule
/// code never sees an event without a state key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTrackingEvent")]
pub struct TrackingEvent {
    detection_id: String,
    timestamp: i64,
    camera_id: String,
    subject_id: String,
    is_facing_camera: bool,
    gaze_direction: Option<String>,
    depth_position: i32,
    has_weapon: bool,
    weapon_type: Option<String>,
    weapon_location: Option<String>,
    evidence_url: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// Wire shape accepted from producers before validation.
///
/// `userId` and `snapshotUrl` are the names older vision agents emit.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrackingEvent {
    detection_id: Option<String>,
    #[serde(default)]
    timestamp: i64,
    camera_id: String,
    #[serde(alias = "userId")]
    subject_id: Option<String>,
    #[serde(default)]
    is_facing_camera: bool,
    #[serde(default)]
    gaze_direction: Option<String>,
    #[serde(default)]
    depth_position: i32,
    #[serde(default)]
    has_weapon: bool,
    #[serde(default)]
    weapon_type: Option<String>,
    #[serde(default)]
    weapon_location: Option<String>,
    #[serde(default, alias = "snapshotUrl")]
    evidence_url: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

impl TryFrom<RawTrackingEvent> for TrackingEvent {
    type Error = EventError;

    fn try_from(raw: RawTrackingEvent) -> Result<Self, Self::Error> {
        let mut event = TrackingEvent::new(
            raw.detection_id.unwrap_or_default(),
            raw.subject_id.unwrap_or_default(),
            raw.camera_id,
        )?;
        event.timestamp = raw.timestamp;
        event.is_facing_camera = raw.is_facing_camera;
        event.gaze_direction = raw.gaze_direction;
        event.depth_position = raw.depth_position;
        event.has_weapon = raw.has_weapon;
        event.weapon_type = raw.weapon_type;
        event.weapon_location = raw.weapon_location;
        event.evidence_url = raw.evidence_url;
        event.latitude = raw.latitude;
        event.longitude = raw.longitude;
        Ok(event)
    }
}

fn require(field: &'static str, value: String) -> Result<String, EventError> {
    if value.trim().is_empty() {
        Err(EventError::Blank(field))
    } else {
        Ok(value)
    }
}

impl TrackingEvent {
    /// Create an event with every optional signal cleared.
    ///
    /// Fails with [`EventError::Blank`] when `detection_id` or `subject_id`
    /// is empty or whitespace.
    pub fn new(
        detection_id: impl Into<String>,
        subject_id: impl Into<String>,
        camera_id: impl Into<String>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            detection_id: require("detectionId", detection_id.into())?,
            timestamp: 0,
            camera_id: camera_id.into(),
            subject_id: require("subjectId", subject_id.into())?,
            is_facing_camera: false,
            gaze_direction: None,
            depth_position: 0,
            has_weapon: false,
            weapon_type: None,
            weapon_location: None,
            evidence_url: None,
            latitude: None,
            longitude: None,
        })
    }

    /// Decode and validate a JSON payload.
    ///
    /// Malformed JSON or a missing required field gives
    /// [`EventError::Payload`]; a blank id gives [`EventError::Blank`].
    pub fn from_json(body: &str) -> Result<Self, EventError> {
        let raw: RawTrackingEvent =
            serde_json::from_str(body).map_err(|e| EventError::Payload(e.to_string()))?;
        TrackingEvent::try_from(raw)
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_gaze(mut self, facing: bool, direction: Option<String>) -> Self {
        self.is_facing_camera = facing;
        self.gaze_direction = direction;
        self
    }

    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth_position = depth;
        self
    }

    /// Mark the frame as carrying a weapon detection.
    pub fn with_weapon(
        mut self,
        weapon_type: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        self.has_weapon = true;
        self.weapon_type = Some(weapon_type.into());
        self.weapon_location = Some(location.into());
        self
    }

    pub fn with_evidence(mut self, url: impl Into<String>) -> Self {
        self.evidence_url = Some(url.into());
        self
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn detection_id(&self) -> &str {
        &self.detection_id
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn is_facing_camera(&self) -> bool {
        self.is_facing_camera
    }

    pub fn gaze_direction(&self) -> Option<&str> {
        self.gaze_direction.as_deref()
    }

    /// Proximity proxy; larger means closer to the camera.
    pub fn depth_position(&self) -> i32 {
        self.depth_position
    }

    pub fn has_weapon(&self) -> bool {
        self.has_weapon
    }

    pub fn weapon_type(&self) -> Option<&str> {
        self.weapon_type.as_deref()
    }

    pub fn weapon_location(&self) -> Option<&str> {
        self.weapon_location.as_deref()
    }

    /// Snapshot URL carried by this frame, if it is present and non-empty.
    pub fn evidence_url(&self) -> Option<&str> {
        self.evidence_url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    pub fn longitude(&self) -> Option<f64> {
        self.longitude
    }
}
