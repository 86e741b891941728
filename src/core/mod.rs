//! Core pipeline for the Robohand agent.
//!
//! This module contains:
//! - Finger bend estimation from landmark geometry
//! - Temporal smoothing of per-frame bend vectors
//! - Gesture classification with change hysteresis

pub mod bend;
pub mod gesture;
pub mod smoothing;

// Re-export commonly used types
pub use bend::{
    estimate, EstimateError, FingerBendVector, HandLandmarkSet, Landmark, FINGER_MCPS,
    FINGER_NAMES, FINGER_PIPS, FINGER_TIPS, LANDMARK_COUNT,
};
pub use gesture::{
    Classification, GestureClassifier, GestureTemplate, GESTURE_TEMPLATES, UNKNOWN_GESTURE,
};
pub use smoothing::TemporalSmoother;
