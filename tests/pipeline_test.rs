//! End-to-end tests: detector stream in, command stream out.

use robohand_agent::{
    bus::{MemoryTransport, Transport},
    config::Config,
    core::{FINGER_MCPS, FINGER_PIPS, FINGER_TIPS, LANDMARK_COUNT},
    publisher::CommandPublisher,
    session::{ControlMode, HandPipeline},
    tracker::{ControlCommand, LandmarkReader, TrackerEvent},
};
use std::io::Cursor;
use std::time::{Duration, Instant};

/// JSON line for a synthetic open hand, all fingers extended.
fn open_hand_line() -> String {
    let mut triples = vec![[0.0_f64, 0.0, 0.0]; LANDMARK_COUNT];
    triples[0] = [0.5, 0.9, 0.0];
    for finger in 0..5 {
        let x = 0.3 + 0.1 * finger as f64;
        triples[FINGER_MCPS[finger]] = [x, 0.6, 0.0];
        triples[FINGER_PIPS[finger]] = [x, 0.45, 0.0];
        triples[FINGER_TIPS[finger]] = [x, 0.3, 0.0];
    }
    let coords: Vec<String> = triples
        .iter()
        .map(|t| format!("[{},{},{}]", t[0], t[1], t[2]))
        .collect();
    format!("{{\"landmarks\":[{}]}}", coords.join(","))
}

fn make_pipeline(mode: ControlMode) -> (HandPipeline<MemoryTransport>, MemoryTransport) {
    let config = Config::default();
    let transport = MemoryTransport::new();
    let publisher = CommandPublisher::new(
        transport.clone(),
        "robohand/itest/cmd/servo".to_string(),
        config.min_update_interval(),
    );
    (HandPipeline::new(config, mode, publisher), transport)
}

/// Drive a pipeline from a scripted detector stream starting at `start`,
/// spacing frames so the rate limiter never interferes unless the script
/// says otherwise. Tests driving one pipeline through several streams
/// must hand each stream a later start time.
fn run_stream(pipeline: &mut HandPipeline<MemoryTransport>, input: &str, start: Instant) {
    let reader = LandmarkReader::spawn(Cursor::new(input.to_string()));
    let mut now = start;

    loop {
        let event = reader
            .receiver()
            .recv_timeout(Duration::from_secs(1))
            .expect("reader should produce events");
        match event {
            TrackerEvent::Hand { landmarks, .. } => {
                pipeline.process_hand(&landmarks, now);
                now += Duration::from_millis(100);
            }
            TrackerEvent::NoHand { .. } => {
                pipeline.process_no_hand();
            }
            TrackerEvent::Control(ControlCommand::ToggleMode) => {
                pipeline.toggle_mode();
            }
            TrackerEvent::Control(ControlCommand::Reset) => {
                let _ = pipeline.reset_neutral();
            }
            TrackerEvent::Control(ControlCommand::Quit) | TrackerEvent::StreamEnded => break,
        }
    }
}

#[test]
fn test_open_hand_stream_publishes_exactly_one_gesture() {
    let (mut pipeline, transport) = make_pipeline(ControlMode::Gesture);

    // Well past window size, healthy connection.
    let input = vec![open_hand_line(); 20].join("\n");
    run_stream(&mut pipeline, &input, Instant::now());

    let published = transport.published();
    assert_eq!(published.len(), 1, "one command for one held gesture");
    assert_eq!(published[0].0, "robohand/itest/cmd/servo");
    assert_eq!(published[0].1, r#"{"gesture":"open"}"#);
}

#[test]
fn test_manual_reset_publishes_neutral_regardless_of_state() {
    let (mut pipeline, transport) = make_pipeline(ControlMode::Gesture);

    // Reset before any hand was ever seen, mid-warmup, and after a publish.
    let mut lines = vec![r#"{"control":"reset"}"#.to_string()];
    lines.extend(vec![open_hand_line(); 2]);
    lines.push(r#"{"control":"reset"}"#.to_string());
    lines.extend(vec![open_hand_line(); 10]);
    lines.push(r#"{"control":"reset"}"#.to_string());

    run_stream(&mut pipeline, &lines.join("\n"), Instant::now());

    let published = transport.published();
    let neutral = r#"{"fingers":[0.5,0.5,0.5,0.5,0.5]}"#;
    let neutral_count = published.iter().filter(|(_, p)| p == neutral).count();
    assert_eq!(neutral_count, 3);
    // Plus exactly one gesture publish from the hand frames.
    assert_eq!(published.len(), 4);
}

#[test]
fn test_mode_toggle_switches_to_raw_vectors() {
    let (mut pipeline, transport) = make_pipeline(ControlMode::Gesture);

    let mut lines = vec![open_hand_line(); 6];
    lines.push(r#"{"control":"toggle_mode"}"#.to_string());
    lines.extend(vec![open_hand_line(); 3]);

    run_stream(&mut pipeline, &lines.join("\n"), Instant::now());

    let published = transport.published();
    assert!(published[0].1.contains(r#""gesture":"open""#));
    // After the toggle every eligible frame carries raw fingers.
    let raw_count = published
        .iter()
        .filter(|(_, p)| p.contains(r#""fingers""#))
        .count();
    assert_eq!(raw_count, 3);
}

#[test]
fn test_tracking_loss_forces_re_warmup_and_re_emit() {
    let (mut pipeline, transport) = make_pipeline(ControlMode::Gesture);

    let mut lines = vec![open_hand_line(); 8];
    lines.push(r#"{"landmarks":null}"#.to_string());
    lines.extend(vec![open_hand_line(); 8]);

    run_stream(&mut pipeline, &lines.join("\n"), Instant::now());

    // Same gesture both times, but the fresh session re-emits it.
    let published = transport.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].1, published[1].1);
}

#[test]
fn test_dead_link_drops_everything_and_recovers() {
    let (mut pipeline, transport) = make_pipeline(ControlMode::Gesture);
    transport.health().set_up(false);

    let start = Instant::now();
    run_stream(&mut pipeline, &vec![open_hand_line(); 10].join("\n"), start);
    assert_eq!(transport.published_count(), 0);

    // Link restored: the still-held gesture was consumed by the failed
    // attempt, so a change (tracking loss then re-detection) re-emits.
    transport.health().set_up(true);
    let mut lines = vec![r#"{"landmarks":null}"#.to_string()];
    lines.extend(vec![open_hand_line(); 10]);
    run_stream(
        &mut pipeline,
        &lines.join("\n"),
        start + Duration::from_secs(10),
    );
    assert_eq!(transport.published_count(), 1);
}

#[test]
fn test_quit_control_stops_the_stream() {
    let (mut pipeline, transport) = make_pipeline(ControlMode::Gesture);

    let mut lines = vec![open_hand_line(); 3];
    lines.push(r#"{"control":"quit"}"#.to_string());
    lines.extend(vec![open_hand_line(); 20]);

    run_stream(&mut pipeline, &lines.join("\n"), Instant::now());

    // Frames after quit were never processed: still warming up.
    assert_eq!(transport.published_count(), 0);
}
