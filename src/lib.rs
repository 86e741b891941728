//! Robohand Agent - hand-pose to servo command bridge.
//!
//! This library turns a stream of hand landmark observations from an
//! external detector into a stable, rate-limited servo command stream
//! for a robotic hand on a message bus.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Robohand Agent                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌──────────┐ │
//! │  │ Tracker  │──▶│   Bend    │──▶│ Smoother │──▶│ Gesture/ │ │
//! │  │ (stream) │   │ estimator │   │ (window) │   │   raw    │ │
//! │  └──────────┘   └───────────┘   └──────────┘   └────┬─────┘ │
//! │                                                     ▼       │
//! │                              ┌───────────┐   ┌───────────┐  │
//! │                              │    Bus    │◀──│ Publisher │  │
//! │                              │  bridge   │   │ (rate cap)│  │
//! │                              └───────────┘   └───────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per-frame flow: landmarks are reduced to five bend ratios, averaged
//! over a short window, and either classified into a named gesture
//! (published only on change) or passed through raw. Publication is
//! rate-capped and gated on connection health; commands that cannot go
//! out are dropped, never replayed. Latest state wins.
//!
//! # Example
//!
//! ```no_run
//! use std::io::BufReader;
//! use robohand_agent::tracker::LandmarkReader;
//!
//! // Read detector frames from stdin
//! let reader = LandmarkReader::spawn(BufReader::new(std::io::stdin()));
//! while let Ok(event) = reader.receiver().recv() {
//!     // feed events into a HandPipeline
//!     let _ = event;
//! }
//! ```

pub mod bus;
pub mod config;
pub mod core;
pub mod publisher;
pub mod session;
pub mod tracker;

// Re-export key types at crate root for convenience
pub use bus::{BridgeClient, BridgeEndpoints, BusError, ConnectionHealth, MemoryTransport, Transport};
pub use config::{BusSettings, Config, ConfigError};
pub use self::core::{
    estimate, FingerBendVector, GestureClassifier, HandLandmarkSet, Landmark, TemporalSmoother,
};
pub use publisher::{CommandPublisher, OutboundCommand, PublishDecision, PublishError, RateLimiter};
pub use session::{ControlMode, FrameOutcome, HandPipeline, HandSession};
pub use tracker::{ControlCommand, LandmarkReader, TrackerEvent};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
