//! Command publication: payload composition, rate limiting, link gating.
//!
//! The publisher is the only component that writes to the transport. It
//! never queues: a command that cannot go out right now is dropped and
//! superseded by whatever the next frame produces. Latest state wins.

use crate::bus::{BusError, ConnectionHealth, Transport};
use crate::core::FingerBendVector;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;

/// A logical outbound command.
///
/// Serializes to the wire payload directly: a flat JSON object with
/// exactly one of the keys `gesture` or `fingers`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundCommand {
    /// A discrete gesture name, e.g. `{"gesture":"fist"}`
    Gesture(String),
    /// Raw bend ratios, e.g. `{"fingers":[0.5,0.5,0.5,0.5,0.5]}`
    Fingers(FingerBendVector),
}

impl OutboundCommand {
    /// The manual-reset command: all servos to mid travel.
    pub fn neutral() -> Self {
        OutboundCommand::Fingers(FingerBendVector::neutral())
    }

    pub fn to_payload(&self) -> Result<String, PublishError> {
        serde_json::to_string(self).map_err(|e| PublishError::Serialize(e.to_string()))
    }
}

/// Wall-clock gate bounding command frequency.
///
/// The stored timestamp advances when the caller reports an attempted
/// send, not when `ready` is consulted; the limiter itself assumes
/// nothing about success.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_send: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_send: None,
        }
    }

    /// True iff enough time has passed since the last attempted send.
    pub fn ready(&self, now: Instant) -> bool {
        match self.last_send {
            Some(last) => now.duration_since(last) > self.min_interval,
            None => true,
        }
    }

    /// Record that a send was attempted at `now`.
    pub fn mark(&mut self, now: Instant) {
        self.last_send = Some(now);
    }

    pub fn reset(&mut self) {
        self.last_send = None;
    }
}

/// Why a publish attempt produced no transmission.
#[derive(Debug)]
pub enum PublishError {
    /// Connection health is down; nothing was attempted.
    TransportUnavailable,
    /// The local send attempt itself failed.
    Send(BusError),
    /// Payload could not be serialized.
    Serialize(String),
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishError::TransportUnavailable => write!(f, "bus connection is down"),
            PublishError::Send(e) => write!(f, "send failed: {e}"),
            PublishError::Serialize(e) => write!(f, "payload serialization failed: {e}"),
        }
    }
}

impl std::error::Error for PublishError {}

/// Outcome of a rate-gated publish request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishDecision {
    /// The command was handed to the transport.
    Sent,
    /// The rate limiter denied this frame; nothing was attempted.
    RateLimited,
}

/// Composes payloads and forwards them to the transport.
pub struct CommandPublisher<T: Transport> {
    transport: T,
    topic: String,
    limiter: RateLimiter,
    health: ConnectionHealth,
}

impl<T: Transport> CommandPublisher<T> {
    pub fn new(transport: T, topic: String, min_interval: Duration) -> Self {
        let health = transport.health();
        Self {
            transport,
            topic,
            limiter: RateLimiter::new(min_interval),
            health,
        }
    }

    /// Whether the rate limiter would admit a publish at `now`. Consulting
    /// this does not consume the slot.
    pub fn ready(&self, now: Instant) -> bool {
        self.limiter.ready(now)
    }

    /// Publish through the rate limiter.
    ///
    /// When the gate passes, the limiter is marked regardless of whether
    /// the attempt then succeeds; a failed send does not earn a retry
    /// ahead of schedule.
    pub fn try_publish(
        &mut self,
        command: &OutboundCommand,
        now: Instant,
    ) -> Result<PublishDecision, PublishError> {
        if !self.limiter.ready(now) {
            return Ok(PublishDecision::RateLimited);
        }
        self.limiter.mark(now);
        self.send(command)?;
        Ok(PublishDecision::Sent)
    }

    /// Publish immediately, bypassing the rate limiter. Used for the
    /// manual neutral reset, which is a direct override.
    pub fn force_publish(&mut self, command: &OutboundCommand) -> Result<(), PublishError> {
        self.send(command)
    }

    fn send(&mut self, command: &OutboundCommand) -> Result<(), PublishError> {
        if !self.health.is_up() {
            return Err(PublishError::TransportUnavailable);
        }
        let payload = command.to_payload()?;
        debug!("publishing to {}: {payload}", self.topic);
        self.transport
            .publish(&self.topic, &payload)
            .map_err(PublishError::Send)
    }

    pub fn connected(&self) -> bool {
        self.health.is_up()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn shutdown(&mut self) {
        self.transport.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryTransport;

    fn publisher(transport: MemoryTransport) -> CommandPublisher<MemoryTransport> {
        CommandPublisher::new(
            transport,
            "robohand/test/cmd/servo".to_string(),
            Duration::from_secs_f64(1.0 / 30.0),
        )
    }

    #[test]
    fn test_gesture_payload_shape() {
        let cmd = OutboundCommand::Gesture("fist".to_string());
        assert_eq!(cmd.to_payload().unwrap(), r#"{"gesture":"fist"}"#);
    }

    #[test]
    fn test_fingers_payload_shape() {
        let cmd = OutboundCommand::neutral();
        assert_eq!(
            cmd.to_payload().unwrap(),
            r#"{"fingers":[0.5,0.5,0.5,0.5,0.5]}"#
        );
    }

    #[test]
    fn test_rate_limiter_timing() {
        let mut limiter = RateLimiter::new(Duration::from_secs_f64(1.0 / 30.0));
        let start = Instant::now();

        assert!(limiter.ready(start));
        limiter.mark(start);

        // 10 ms later: denied at 30 Hz.
        assert!(!limiter.ready(start + Duration::from_millis(10)));
        // 40 ms later: allowed.
        assert!(limiter.ready(start + Duration::from_millis(40)));
    }

    #[test]
    fn test_publish_respects_rate_limit() {
        let transport = MemoryTransport::new();
        let mut publisher = publisher(transport.clone());
        let start = Instant::now();
        let cmd = OutboundCommand::neutral();

        assert_eq!(
            publisher.try_publish(&cmd, start).unwrap(),
            PublishDecision::Sent
        );
        assert_eq!(
            publisher
                .try_publish(&cmd, start + Duration::from_millis(10))
                .unwrap(),
            PublishDecision::RateLimited
        );
        assert_eq!(transport.published_count(), 1);
    }

    #[test]
    fn test_down_link_short_circuits() {
        let transport = MemoryTransport::new();
        transport.health().set_up(false);
        let mut publisher = publisher(transport.clone());

        let result = publisher.try_publish(&OutboundCommand::neutral(), Instant::now());
        assert!(matches!(result, Err(PublishError::TransportUnavailable)));
        assert_eq!(transport.published_count(), 0);
    }

    #[test]
    fn test_failed_send_still_marks_limiter() {
        let transport = MemoryTransport::new();
        transport.set_failing(true);
        let mut publisher = publisher(transport.clone());
        let start = Instant::now();

        let result = publisher.try_publish(&OutboundCommand::neutral(), start);
        assert!(matches!(result, Err(PublishError::Send(_))));

        // The failed attempt consumed this slot.
        transport.set_failing(false);
        assert_eq!(
            publisher
                .try_publish(&OutboundCommand::neutral(), start + Duration::from_millis(5))
                .unwrap(),
            PublishDecision::RateLimited
        );
    }

    #[test]
    fn test_force_publish_ignores_limiter() {
        let transport = MemoryTransport::new();
        let mut publisher = publisher(transport.clone());
        let start = Instant::now();

        publisher
            .try_publish(&OutboundCommand::neutral(), start)
            .unwrap();
        // Immediately after a send, force still goes through.
        publisher.force_publish(&OutboundCommand::neutral()).unwrap();
        assert_eq!(transport.published_count(), 2);
    }
}
