//! Landmark stream ingestion for the Robohand agent.
//!
//! The agent does not detect hands itself. An external detector process
//! emits frames as JSON lines; this module parses that stream and hands
//! typed events to the frame loop over a channel.

pub mod reader;
pub mod types;

// Re-export commonly used types
pub use reader::LandmarkReader;
pub use types::{parse_line, ControlCommand, ParseError, TrackerEvent};
