//! Demonstration of the Robohand agent pipeline on a scripted stream.
//!
//! This example shows how to:
//! 1. Build a pipeline over the in-memory transport
//! 2. Feed it a scripted detector stream
//! 3. Observe the resulting command stream
//!
//! Run with: cargo run --example replay_demo

use robohand_agent::{
    bus::MemoryTransport,
    config::Config,
    core::{FINGER_MCPS, FINGER_PIPS, FINGER_TIPS, LANDMARK_COUNT},
    publisher::CommandPublisher,
    session::{ControlMode, HandPipeline},
    tracker::{LandmarkReader, TrackerEvent},
};
use std::io::Cursor;
use std::time::{Duration, Instant};

/// Synthetic hand frame: extended fingers with the given tip pull-in.
/// 0.0 reads as an open hand, folding the tips onto the MCPs reads a fist.
fn hand_line(curl: f64) -> String {
    let mut triples = vec![[0.0_f64, 0.0, 0.0]; LANDMARK_COUNT];
    triples[0] = [0.5, 0.9, 0.0];
    for finger in 0..5 {
        let x = 0.3 + 0.1 * finger as f64;
        triples[FINGER_MCPS[finger]] = [x, 0.6, 0.0];
        triples[FINGER_PIPS[finger]] = [x, 0.45, 0.0];
        triples[FINGER_TIPS[finger]] = [x, 0.3 + 0.3 * curl, 0.0];
    }
    let coords: Vec<String> = triples
        .iter()
        .map(|t| format!("[{},{},{}]", t[0], t[1], t[2]))
        .collect();
    format!("{{\"landmarks\":[{}]}}", coords.join(","))
}

fn main() {
    println!("Robohand Agent - Replay Demo");
    println!("============================");
    println!();

    let config = Config::default();
    let transport = MemoryTransport::new();
    let publisher = CommandPublisher::new(
        transport.clone(),
        "robohand/demo/cmd/servo".to_string(),
        config.min_update_interval(),
    );
    let mut pipeline = HandPipeline::new(config, ControlMode::Gesture, publisher);

    // Script: hold an open hand, curl into a fist, lose tracking, reset.
    let mut lines: Vec<String> = Vec::new();
    lines.extend(std::iter::repeat_with(|| hand_line(0.0)).take(10));
    lines.extend(std::iter::repeat_with(|| hand_line(1.0)).take(10));
    lines.push(r#"{"landmarks":null}"#.to_string());
    lines.push(r#"{"control":"reset"}"#.to_string());
    lines.push(r#"{"control":"quit"}"#.to_string());

    let reader = LandmarkReader::spawn(Cursor::new(lines.join("\n")));
    let mut now = Instant::now();

    loop {
        let Ok(event) = reader.receiver().recv_timeout(Duration::from_secs(1)) else {
            break;
        };
        match event {
            TrackerEvent::Hand { landmarks, .. } => {
                let outcome = pipeline.process_hand(&landmarks, now);
                println!("frame -> {outcome:?}");
                now += Duration::from_millis(100);
            }
            TrackerEvent::NoHand { .. } => {
                println!("frame -> {:?}", pipeline.process_no_hand());
            }
            TrackerEvent::Control(command) => {
                println!("control -> {command:?}");
                if command == robohand_agent::tracker::ControlCommand::Reset {
                    let _ = pipeline.reset_neutral();
                }
                if command == robohand_agent::tracker::ControlCommand::Quit {
                    break;
                }
            }
            TrackerEvent::StreamEnded => break,
        }
    }

    println!();
    println!("Published commands:");
    for (topic, payload) in transport.published() {
        println!("  {topic}: {payload}");
    }
}
