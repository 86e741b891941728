//! Gesture classification over smoothed bend vectors.
//!
//! A smoothed vector is matched against a fixed table of reference bend
//! vectors by Euclidean distance. The classifier also carries the change
//! hysteresis: an unchanged result is reported but flagged as suppressed,
//! so callers never re-publish the same gesture frame after frame.

use crate::core::bend::FingerBendVector;

/// Label reported when no template is within the match threshold.
pub const UNKNOWN_GESTURE: &str = "unknown";

/// A named reference bend vector.
#[derive(Debug, Clone, Copy)]
pub struct GestureTemplate {
    pub name: &'static str,
    pub bends: FingerBendVector,
}

/// The built-in gesture table. Iteration order is fixed; on a distance tie
/// the earlier entry wins, which is accepted as a tie-break rather than a
/// claim of correctness.
pub const GESTURE_TEMPLATES: [GestureTemplate; 5] = [
    GestureTemplate {
        name: "open",
        bends: FingerBendVector([0.0, 0.0, 0.0, 0.0, 0.0]),
    },
    GestureTemplate {
        name: "fist",
        bends: FingerBendVector([1.0, 1.0, 1.0, 1.0, 1.0]),
    },
    GestureTemplate {
        name: "peace",
        bends: FingerBendVector([1.0, 0.0, 0.0, 1.0, 1.0]),
    },
    GestureTemplate {
        name: "point",
        bends: FingerBendVector([1.0, 0.0, 1.0, 1.0, 1.0]),
    },
    GestureTemplate {
        name: "thumbs_up",
        bends: FingerBendVector([0.0, 1.0, 1.0, 1.0, 1.0]),
    },
];

/// Result of classifying one smoothed vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Best-matching gesture name, or [`UNKNOWN_GESTURE`].
    pub label: String,
    /// True only when the label differs from the previously emitted one.
    pub emit: bool,
}

/// Nearest-template matcher with change hysteresis.
#[derive(Debug, Clone)]
pub struct GestureClassifier {
    threshold: f64,
    last_emitted: Option<String>,
}

impl GestureClassifier {
    /// `threshold` is the maximum Euclidean distance for a template match.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last_emitted: None,
        }
    }

    /// Classify a smoothed bend vector.
    ///
    /// The held label advances only when `emit` is true, so a suppressed
    /// frame leaves the hysteresis state untouched.
    pub fn classify(&mut self, bends: &FingerBendVector) -> Classification {
        let label = self.match_template(bends);
        let emit = self.last_emitted.as_deref() != Some(label);
        if emit {
            self.last_emitted = Some(label.to_string());
        }
        Classification {
            label: label.to_string(),
            emit,
        }
    }

    /// Nearest template under the threshold, without touching hysteresis.
    pub fn match_template(&self, bends: &FingerBendVector) -> &'static str {
        let mut best = UNKNOWN_GESTURE;
        let mut min_distance = f64::INFINITY;

        for template in &GESTURE_TEMPLATES {
            let distance = bends.distance(&template.bends);
            if distance < min_distance {
                min_distance = distance;
                best = template.name;
            }
        }

        if min_distance < self.threshold {
            best
        } else {
            UNKNOWN_GESTURE
        }
    }

    /// The label last reported with `emit = true`, if any.
    pub fn last_emitted(&self) -> Option<&str> {
        self.last_emitted.as_deref()
    }

    /// Forget the held label. Called on tracking loss.
    pub fn reset(&mut self) {
        self.last_emitted = None;
    }
}
