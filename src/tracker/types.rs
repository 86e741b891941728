//! Event types for the landmark stream.
//!
//! The detector is an external process (typically the MediaPipe demo
//! script) that emits one JSON object per line. Hand frames, no-hand
//! frames, and operator control commands all arrive on the same stream.

use crate::core::bend::HandLandmarkSet;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Operator control commands, delivered in-band with the frame stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlCommand {
    /// Switch between gesture and raw control modes
    ToggleMode,
    /// Publish a neutral hand position immediately
    Reset,
    /// Stop the agent
    Quit,
}

/// A single event delivered to the frame loop.
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    /// A frame with one detected hand
    Hand {
        timestamp: DateTime<Utc>,
        landmarks: HandLandmarkSet,
    },
    /// A frame with no detected hand
    NoHand { timestamp: DateTime<Utc> },
    /// An operator control command
    Control(ControlCommand),
    /// The detector stream ended (end of input or read failure)
    StreamEnded,
}

impl TrackerEvent {
    pub fn hand(landmarks: HandLandmarkSet) -> Self {
        TrackerEvent::Hand {
            timestamp: Utc::now(),
            landmarks,
        }
    }

    pub fn no_hand() -> Self {
        TrackerEvent::NoHand {
            timestamp: Utc::now(),
        }
    }
}

/// Parse errors for detector lines.
#[derive(Debug)]
pub enum ParseError {
    Malformed(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Malformed(e) => write!(f, "malformed detector line: {e}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse one line of detector output into a tracker event.
///
/// A line carries either a `control` key or a `landmarks` key;
/// `{"landmarks": null}` is a frame with no detected hand.
pub fn parse_line(line: &str) -> Result<TrackerEvent, ParseError> {
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| ParseError::Malformed(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| ParseError::Malformed("expected a JSON object".to_string()))?;

    if let Some(control) = object.get("control") {
        let command: ControlCommand = serde_json::from_value(control.clone())
            .map_err(|e| ParseError::Malformed(e.to_string()))?;
        return Ok(TrackerEvent::Control(command));
    }

    match object.get("landmarks") {
        Some(serde_json::Value::Null) => Ok(TrackerEvent::no_hand()),
        Some(landmarks) => {
            let triples: Vec<[f64; 3]> = serde_json::from_value(landmarks.clone())
                .map_err(|e| ParseError::Malformed(e.to_string()))?;
            Ok(TrackerEvent::hand(HandLandmarkSet::from_triples(&triples)))
        }
        None => Err(ParseError::Malformed(
            "expected a landmarks or control key".to_string(),
        )),
    }
}
