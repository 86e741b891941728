//! Finger bend estimation from hand landmark geometry.
//!
//! Converts a 21-point hand landmark set (MediaPipe numbering) into five
//! normalized bend ratios, one per finger. The estimator is pure: same
//! landmarks in, same vector out, no state.

use serde::{Deserialize, Serialize};

/// Number of landmarks in a complete hand set.
pub const LANDMARK_COUNT: usize = 21;

/// Fingertip landmark indices, thumb through pinky.
pub const FINGER_TIPS: [usize; 5] = [4, 8, 12, 16, 20];

/// PIP joint landmark indices, thumb through pinky.
pub const FINGER_PIPS: [usize; 5] = [3, 6, 10, 14, 18];

/// MCP joint landmark indices, thumb through pinky.
pub const FINGER_MCPS: [usize; 5] = [2, 5, 9, 13, 17];

/// Display names for the five fingers, in vector order.
pub const FINGER_NAMES: [&str; 5] = ["thumb", "index", "middle", "ring", "pinky"];

/// Guard against division by a zero-length vector norm.
const NORM_EPSILON: f64 = 1e-6;

/// A single annotated skeletal point on a detected hand.
///
/// Coordinates are normalized image coordinates in [0, 1]. The z component
/// is relative depth from the detector and may be zero when unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Planar distance to another landmark. Bend geometry is 2D.
    fn distance_2d(&self, other: &Landmark) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Exactly one detected hand's landmarks, indexed by the fixed anatomical
/// numbering.
///
/// A set may arrive short from a misbehaving detector; the estimator
/// rejects any set missing the indices it needs rather than panicking.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarkSet {
    points: Vec<Landmark>,
}

impl HandLandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    /// Build a set from raw `[x, y, z]` triples as emitted by the detector.
    pub fn from_triples(triples: &[[f64; 3]]) -> Self {
        Self {
            points: triples
                .iter()
                .map(|t| Landmark {
                    x: t[0],
                    y: t[1],
                    z: t[2],
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether all indices the estimator reads are present.
    pub fn is_complete(&self) -> bool {
        self.points.len() >= LANDMARK_COUNT
    }

    fn get(&self, index: usize) -> Result<&Landmark, EstimateError> {
        self.points
            .get(index)
            .ok_or(EstimateError::MissingLandmark(index))
    }
}

/// Ordered bend ratios for the five fingers (thumb, index, middle, ring,
/// pinky). 0.0 = fully extended, 1.0 = fully bent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FingerBendVector(pub [f64; 5]);

impl FingerBendVector {
    pub fn new(values: [f64; 5]) -> Self {
        Self(values)
    }

    /// Mid-travel position for every servo, used for the manual reset.
    pub fn neutral() -> Self {
        Self([0.5; 5])
    }

    pub fn as_array(&self) -> &[f64; 5] {
        &self.0
    }

    /// Euclidean distance to another bend vector.
    pub fn distance(&self, other: &FingerBendVector) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

impl std::fmt::Display for FingerBendVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.2}, {:.2}, {:.2}, {:.2}, {:.2}]",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4]
        )
    }
}

/// Estimation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimateError {
    /// The landmark set does not contain the given index.
    MissingLandmark(usize),
}

impl std::fmt::Display for EstimateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimateError::MissingLandmark(i) => write!(f, "landmark set missing index {i}"),
        }
    }
}

impl std::error::Error for EstimateError {}

/// Compute the bend vector for a complete landmark set.
///
/// The frame is skipped upstream on error; no state is touched here.
pub fn estimate(landmarks: &HandLandmarkSet) -> Result<FingerBendVector, EstimateError> {
    let mut bends = [0.0; 5];
    for (finger, bend) in bends.iter_mut().enumerate() {
        *bend = finger_bend(landmarks, finger)?;
    }
    Ok(FingerBendVector(bends))
}

/// Bend ratio for one finger.
///
/// Thumb: angle at the PIP between tip and MCP, mapped so a straight thumb
/// (angle pi) reads 0.0. Other fingers: tip-to-MCP distance relative to
/// twice the PIP-to-MCP distance; curling pulls the tip toward the MCP and
/// drives the ratio toward 1.0.
fn finger_bend(landmarks: &HandLandmarkSet, finger: usize) -> Result<f64, EstimateError> {
    let tip = landmarks.get(FINGER_TIPS[finger])?;
    let pip = landmarks.get(FINGER_PIPS[finger])?;
    let mcp = landmarks.get(FINGER_MCPS[finger])?;

    if finger == 0 {
        let v1 = (tip.x - pip.x, tip.y - pip.y);
        let v2 = (mcp.x - pip.x, mcp.y - pip.y);

        let n1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
        let n2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();

        // A zero-length segment has no angle to speak of; read it as
        // fully extended rather than acos(0).
        if n1 <= NORM_EPSILON || n2 <= NORM_EPSILON {
            return Ok(0.0);
        }

        // Clamp before acos: rounding can push the dot product past +-1.
        let dot = ((v1.0 * v2.0 + v1.1 * v2.1) / ((n1 + NORM_EPSILON) * (n2 + NORM_EPSILON)))
            .clamp(-1.0, 1.0);
        let angle = dot.acos();

        Ok((1.0 - angle / std::f64::consts::PI).clamp(0.0, 1.0))
    } else {
        let tip_to_mcp = tip.distance_2d(mcp);
        let pip_to_mcp = pip.distance_2d(mcp);

        if pip_to_mcp > 0.0 {
            Ok((1.0 - tip_to_mcp / (pip_to_mcp * 2.0)).clamp(0.0, 1.0))
        } else {
            Ok(0.0)
        }
    }
}
