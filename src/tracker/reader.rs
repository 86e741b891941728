//! Reader thread turning a detector byte stream into tracker events.
//!
//! Reads JSON lines from any `BufRead` source (stdin, a replay file, a
//! detector subprocess pipe) and forwards parsed events over a bounded
//! channel to the frame loop. Malformed lines are logged and skipped;
//! end of input or a read error produces a single `StreamEnded`.

use crate::tracker::types::{parse_line, TrackerEvent};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::warn;

/// Channel depth between the reader and the frame loop. The loop drains
/// faster than any sane detector produces; this only absorbs bursts.
const CHANNEL_DEPTH: usize = 256;

/// Handle to the running reader thread.
pub struct LandmarkReader {
    receiver: Receiver<TrackerEvent>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LandmarkReader {
    /// Spawn a reader over the given source.
    pub fn spawn<R: BufRead + Send + 'static>(source: R) -> Self {
        let (sender, receiver) = bounded(CHANNEL_DEPTH);
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = running.clone();

        let handle = std::thread::Builder::new()
            .name("landmark-reader".to_string())
            .spawn(move || read_loop(source, sender, thread_running))
            .expect("failed to spawn landmark reader thread");

        Self {
            receiver,
            running,
            handle: Some(handle),
        }
    }

    /// The event channel for the frame loop.
    pub fn receiver(&self) -> &Receiver<TrackerEvent> {
        &self.receiver
    }

    /// Ask the reader to stop after its current line.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for LandmarkReader {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn read_loop<R: BufRead>(source: R, sender: Sender<TrackerEvent>, running: Arc<AtomicBool>) {
    for line in source.lines() {
        if !running.load(Ordering::SeqCst) {
            return;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("detector stream read error: {e}");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match parse_line(&line) {
            Ok(event) => {
                // Send fails only when the consumer is gone; the stream
                // is over for us then.
                if sender.send(event).is_err() {
                    return;
                }
            }
            Err(e) => warn!("skipping detector line: {e}"),
        }
    }

    let _ = sender.send(TrackerEvent::StreamEnded);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    fn collect_events(input: &str) -> Vec<TrackerEvent> {
        let reader = LandmarkReader::spawn(Cursor::new(input.to_string()));
        let mut events = Vec::new();
        loop {
            match reader.receiver().recv_timeout(Duration::from_secs(1)) {
                Ok(TrackerEvent::StreamEnded) => {
                    events.push(TrackerEvent::StreamEnded);
                    break;
                }
                Ok(event) => events.push(event),
                Err(_) => break,
            }
        }
        events
    }

    #[test]
    fn test_stream_ends_with_sentinel() {
        let events = collect_events(r#"{"landmarks": null}"#);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], TrackerEvent::NoHand { .. }));
        assert!(matches!(events[1], TrackerEvent::StreamEnded));
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let input = "garbage\n{\"landmarks\": null}\n\n{\"control\": \"quit\"}\n";
        let events = collect_events(input);
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], TrackerEvent::NoHand { .. }));
        assert!(matches!(events[1], TrackerEvent::Control(_)));
        assert!(matches!(events[2], TrackerEvent::StreamEnded));
    }

    #[test]
    fn test_empty_stream() {
        let events = collect_events("");
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], TrackerEvent::StreamEnded));
    }
}
