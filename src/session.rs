//! Per-hand tracking session and frame orchestration.
//!
//! `HandSession` holds the state that belongs to one continuously tracked
//! hand: the smoothing window and the classifier's hysteresis. Losing the
//! hand drops the session; the next detection starts from scratch. The
//! `HandPipeline` wires a session, the bend estimator, and the publisher
//! into the per-frame decision described by the control flow: estimate,
//! smooth, gate, classify or pass through, publish.

use crate::bus::Transport;
use crate::config::Config;
use crate::core::{
    estimate, FingerBendVector, GestureClassifier, HandLandmarkSet, TemporalSmoother,
};
use crate::publisher::{CommandPublisher, OutboundCommand, PublishDecision, PublishError};
use std::time::Instant;
use tracing::{debug, warn};

/// Control modes for the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Classify smoothed vectors and publish discrete gesture names
    Gesture,
    /// Publish smoothed bend vectors directly
    Raw,
}

impl ControlMode {
    pub fn toggled(self) -> Self {
        match self {
            ControlMode::Gesture => ControlMode::Raw,
            ControlMode::Raw => ControlMode::Gesture,
        }
    }
}

impl std::fmt::Display for ControlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlMode::Gesture => write!(f, "gesture"),
            ControlMode::Raw => write!(f, "raw"),
        }
    }
}

/// State owned by one continuous tracking session.
#[derive(Debug, Clone)]
pub struct HandSession {
    smoother: TemporalSmoother,
    classifier: GestureClassifier,
}

impl HandSession {
    pub fn new(smoothing_window: usize, gesture_threshold: f64) -> Self {
        Self {
            smoother: TemporalSmoother::new(smoothing_window),
            classifier: GestureClassifier::new(gesture_threshold),
        }
    }
}

/// What one frame produced. Returned for telemetry and tests; the frame
/// loop itself only logs it.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Landmark set was invalid; frame skipped, no state touched.
    InvalidInput,
    /// Smoothing window not yet full; nothing published.
    Warming { frames: usize },
    /// Rate limiter denied this frame.
    RateLimited,
    /// Gesture mode: classification unchanged, publication suppressed.
    Unchanged { gesture: String },
    /// A command went out.
    Published(OutboundCommand),
    /// Publish was due but failed locally; superseded by the next frame.
    PublishFailed(String),
    /// No hand this frame; any session state was cleared.
    TrackingLost,
}

/// The per-frame pipeline: estimator -> smoother -> classifier/passthrough
/// -> publisher.
pub struct HandPipeline<T: Transport> {
    config: Config,
    mode: ControlMode,
    session: Option<HandSession>,
    publisher: CommandPublisher<T>,
    /// Most recent smoothed vector, kept for display/telemetry only.
    last_smoothed: Option<FingerBendVector>,
}

impl<T: Transport> HandPipeline<T> {
    pub fn new(config: Config, mode: ControlMode, publisher: CommandPublisher<T>) -> Self {
        Self {
            config,
            mode,
            session: None,
            publisher,
            last_smoothed: None,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Toggle gesture/raw mode. Session state survives a mode switch.
    pub fn toggle_mode(&mut self) -> ControlMode {
        self.mode = self.mode.toggled();
        self.mode
    }

    pub fn connected(&self) -> bool {
        self.publisher.connected()
    }

    /// Smoothed bend vector from the most recent full window, if any.
    pub fn last_smoothed(&self) -> Option<&FingerBendVector> {
        self.last_smoothed.as_ref()
    }

    /// Whether a hand is currently being tracked.
    pub fn tracking(&self) -> bool {
        self.session.is_some()
    }

    /// Process one frame with a detected hand.
    pub fn process_hand(&mut self, landmarks: &HandLandmarkSet, now: Instant) -> FrameOutcome {
        let bends = match estimate(landmarks) {
            Ok(bends) => bends,
            Err(e) => {
                warn!("skipping frame: {e}");
                return FrameOutcome::InvalidInput;
            }
        };

        let session = self.session.get_or_insert_with(|| {
            debug!("tracking acquired, new session");
            HandSession::new(self.config.smoothing_window, self.config.gesture_threshold)
        });

        session.smoother.push(bends);
        let Some(smoothed) = session.smoother.smoothed() else {
            return FrameOutcome::Warming {
                frames: session.smoother.len(),
            };
        };
        self.last_smoothed = Some(smoothed);

        // Rate gate before classification: a denied frame must leave the
        // hysteresis untouched, or a gesture change landing on it would be
        // recorded as emitted without ever reaching the wire.
        if !self.publisher.ready(now) {
            return FrameOutcome::RateLimited;
        }

        match self.mode {
            ControlMode::Gesture => {
                let classification = session.classifier.classify(&smoothed);
                if !classification.emit {
                    return FrameOutcome::Unchanged {
                        gesture: classification.label,
                    };
                }
                let command = OutboundCommand::Gesture(classification.label);
                self.dispatch(command, now)
            }
            ControlMode::Raw => {
                let command = OutboundCommand::Fingers(smoothed);
                self.dispatch(command, now)
            }
        }
    }

    /// Process a frame with no detected hand: tracking loss clears the
    /// session so a later hand starts with fresh history.
    pub fn process_no_hand(&mut self) -> FrameOutcome {
        if self.session.take().is_some() {
            debug!("tracking lost, session cleared");
        }
        self.last_smoothed = None;
        FrameOutcome::TrackingLost
    }

    /// Manual reset: publish the neutral vector immediately, bypassing
    /// smoothing and the rate limiter.
    pub fn reset_neutral(&mut self) -> Result<(), PublishError> {
        self.publisher.force_publish(&OutboundCommand::neutral())
    }

    /// Orderly shutdown of the transport.
    pub fn shutdown(&mut self) {
        self.publisher.shutdown();
    }

    pub fn publisher(&self) -> &CommandPublisher<T> {
        &self.publisher
    }

    fn dispatch(&mut self, command: OutboundCommand, now: Instant) -> FrameOutcome {
        match self.publisher.try_publish(&command, now) {
            Ok(PublishDecision::Sent) => FrameOutcome::Published(command),
            Ok(PublishDecision::RateLimited) => FrameOutcome::RateLimited,
            Err(e) => {
                warn!("publish failed: {e}");
                FrameOutcome::PublishFailed(e.to_string())
            }
        }
    }
}
