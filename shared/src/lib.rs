//! Krushinova Shared Protocol Types
//!
//! This crate provides the event types, frame codec and session state machine
//! shared by the operator console and the rover controller.

pub mod codec;
pub mod state_machine;

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Operating limits shared by both ends of the link
pub mod limits {
    /// Number of log entries kept by the operator console
    pub const LOG_CAPACITY: usize = 5;

    /// Telemetry push interval on the controller (2 Hz)
    pub const TELEMETRY_INTERVAL_MS: u64 = 500;

    /// How long the controller waits for the `auth` frame after accept
    pub const AUTH_TIMEOUT_MS: u64 = 5000;

    /// How long the controller waits on one operator's socket before dropping it
    pub const SEND_TIMEOUT_MS: u64 = 1000;

    /// Transport connect timeout on the console side
    pub const CONNECT_TIMEOUT_MS: u64 = 5000;

    /// Depth of the per-session inbound and outbound queues
    pub const EVENT_QUEUE_DEPTH: usize = 100;
}

/// One of the five instructions an operator can give the rover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionCommand {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl MotionCommand {
    pub const ALL: [MotionCommand; 5] = [
        MotionCommand::Forward,
        MotionCommand::Backward,
        MotionCommand::Left,
        MotionCommand::Right,
        MotionCommand::Stop,
    ];

    /// Wire name of the command
    pub fn as_str(&self) -> &'static str {
        match self {
            MotionCommand::Forward => "forward",
            MotionCommand::Backward => "backward",
            MotionCommand::Left => "left",
            MotionCommand::Right => "right",
            MotionCommand::Stop => "stop",
        }
    }

    pub fn is_directional(&self) -> bool {
        !matches!(self, MotionCommand::Stop)
    }
}

impl fmt::Display for MotionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown motion command: {0}")]
pub struct UnknownCommand(pub String);

impl FromStr for MotionCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MotionCommand::ALL
            .into_iter()
            .find(|cmd| cmd.as_str() == s)
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

/// A detected-object descriptor as produced by the rover's vision pipeline.
///
/// The descriptor is carried verbatim; nothing about its shape is enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Detection(pub serde_json::Value);

impl Detection {
    /// Build a well-formed descriptor
    pub fn new(name: &str, class_id: u32, confidence: f64, bbox: [f64; 4]) -> Self {
        Self(serde_json::json!({
            "name": name,
            "class": class_id,
            "conf": confidence,
            "box": bbox,
        }))
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(|v| v.as_str())
    }

    pub fn class_id(&self) -> Option<u64> {
        self.0.get("class").and_then(|v| v.as_u64())
    }

    pub fn confidence(&self) -> Option<f64> {
        self.0.get("conf").and_then(|v| v.as_f64())
    }

    /// Bounding box as `[x1, y1, x2, y2]`
    pub fn bounding_box(&self) -> Option<[f64; 4]> {
        let coords = self.0.get("box")?.as_array()?;
        if coords.len() != 4 {
            return None;
        }
        let mut out = [0.0; 4];
        for (slot, value) in out.iter_mut().zip(coords) {
            *slot = value.as_f64()?;
        }
        Some(out)
    }
}

/// Distance field of a snapshot.
///
/// The controller sends centimetres; anything else is kept as received and
/// left for the presentation layer to deal with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Distance {
    Cm(f64),
    Raw(serde_json::Value),
}

impl Distance {
    pub fn cm(&self) -> Option<f64> {
        match self {
            Distance::Cm(cm) => Some(*cm),
            Distance::Raw(_) => None,
        }
    }
}

impl Default for Distance {
    fn default() -> Self {
        Distance::Raw(serde_json::Value::Null)
    }
}

impl From<f64> for Distance {
    fn from(cm: f64) -> Self {
        Distance::Cm(cm)
    }
}

/// Latest known rover state. Each snapshot replaces the previous one wholesale.
///
/// Decoding never rejects a snapshot over its field shapes: a missing or
/// non-string `status` and a non-list `detections` are taken as they come.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    #[serde(default)]
    pub distance: Distance,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_detections")]
    pub detections: Vec<Detection>,
}

impl TelemetrySnapshot {
    pub fn new(distance: f64, status: impl Into<String>, detections: Vec<Detection>) -> Self {
        Self {
            distance: Distance::Cm(distance),
            status: status.into(),
            detections,
        }
    }

    /// Numeric distance, if the controller sent one
    pub fn distance_cm(&self) -> Option<f64> {
        self.distance.cm()
    }
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            distance: Distance::Cm(0.0),
            status: "N/A".into(),
            detections: Vec::new(),
        }
    }
}

fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn lenient_detections<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Detection>, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => items.into_iter().map(Detection).collect(),
        serde_json::Value::Null => Vec::new(),
        other => vec![Detection(other)],
    })
}

/// Payload of a `log` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub msg: String,
}

/// Events pushed by the rover controller to an operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ControllerEvent {
    /// Handshake accepted
    Connect,
    /// Periodic state snapshot
    Telemetry(TelemetrySnapshot),
    /// Operational message
    Log(LogMessage),
}

impl ControllerEvent {
    /// Create a log event
    pub fn log(msg: impl Into<String>) -> Self {
        ControllerEvent::Log(LogMessage { msg: msg.into() })
    }
}

/// Events sent by an operator to the rover controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// First frame on every connection, carries the login token
    Auth { token: String },
    /// Motion command
    Control { command: MotionCommand },
}

impl ClientEvent {
    pub fn auth(token: impl Into<String>) -> Self {
        ClientEvent::Auth {
            token: token.into(),
        }
    }

    pub fn control(command: MotionCommand) -> Self {
        ClientEvent::Control { command }
    }
}

/// Body of `POST /api/login`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response of `POST /api/login`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl LoginResponse {
    pub fn granted(token: impl Into<String>) -> Self {
        Self {
            success: true,
            token: Some(token.into()),
        }
    }

    pub fn denied() -> Self {
        Self {
            success: false,
            token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_login_response_shape() {
        let denied = serde_json::to_value(LoginResponse::denied()).unwrap();
        assert_eq!(denied, json!({"success": false}));

        let granted: LoginResponse =
            serde_json::from_value(json!({"success": true, "token": "demo-token"})).unwrap();
        assert_eq!(granted, LoginResponse::granted("demo-token"));
    }

    #[test]
    fn test_control_wire_format() {
        let event = ClientEvent::control(MotionCommand::Backward);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"event": "control", "data": {"command": "backward"}})
        );
    }

    #[test]
    fn test_connect_has_no_payload() {
        let value = serde_json::to_value(ControllerEvent::Connect).unwrap();
        assert_eq!(value, json!({"event": "connect"}));

        let parsed: ControllerEvent = serde_json::from_value(json!({"event": "connect"})).unwrap();
        assert_eq!(parsed, ControllerEvent::Connect);
    }

    #[test]
    fn test_telemetry_accepts_malformed_detections() {
        let parsed: ControllerEvent = serde_json::from_value(json!({
            "event": "telemetry",
            "data": {"distance": -3.5, "status": "ok", "detections": [42, {"name": "weed"}]}
        }))
        .unwrap();

        let ControllerEvent::Telemetry(snapshot) = parsed else {
            panic!("expected telemetry");
        };
        assert_eq!(snapshot.distance_cm(), Some(-3.5));
        assert_eq!(snapshot.detections.len(), 2);
        assert_eq!(snapshot.detections[0].name(), None);
        assert_eq!(snapshot.detections[1].name(), Some("weed"));
    }

    #[test]
    fn test_telemetry_accepts_malformed_fields() {
        let parse = |data: serde_json::Value| -> TelemetrySnapshot {
            match serde_json::from_value(json!({"event": "telemetry", "data": data})).unwrap() {
                ControllerEvent::Telemetry(snapshot) => snapshot,
                other => panic!("expected telemetry, got {:?}", other),
            }
        };

        let far = parse(json!({"distance": "far", "status": "ok"}));
        assert_eq!(far.distance, Distance::Raw(json!("far")));
        assert_eq!(far.distance_cm(), None);

        let null = parse(json!({"distance": null, "status": 7, "detections": null}));
        assert_eq!(null.distance, Distance::Raw(serde_json::Value::Null));
        assert_eq!(null.status, "7");
        assert!(null.detections.is_empty());

        let bare = parse(json!({"distance": 12}));
        assert_eq!(bare.distance_cm(), Some(12.0));
        assert_eq!(bare.status, "");

        let single = parse(json!({"detections": {"name": "weed"}}));
        assert_eq!(single.distance, Distance::default());
        assert_eq!(single.detections.len(), 1);
        assert_eq!(single.detections[0].name(), Some("weed"));
    }

    #[test]
    fn test_telemetry_distance_serializes_as_number() {
        let value = serde_json::to_value(TelemetrySnapshot::new(42.5, "Idle", vec![])).unwrap();
        assert_eq!(
            value,
            json!({"distance": 42.5, "status": "Idle", "detections": []})
        );
    }

    #[test]
    fn test_detection_accessors() {
        let det = Detection::new("plant", 0, 0.87, [1.0, 2.0, 30.0, 40.0]);
        assert_eq!(det.name(), Some("plant"));
        assert_eq!(det.class_id(), Some(0));
        assert_eq!(det.confidence(), Some(0.87));
        assert_eq!(det.bounding_box(), Some([1.0, 2.0, 30.0, 40.0]));
    }

    #[test]
    fn test_command_from_str() {
        assert_eq!("left".parse::<MotionCommand>(), Ok(MotionCommand::Left));
        assert!("jump".parse::<MotionCommand>().is_err());
        assert!(!MotionCommand::Stop.is_directional());
    }
}
