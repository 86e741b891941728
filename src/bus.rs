//! Message-bus transport seam for command publication.
//!
//! The broker protocol itself is someone else's problem: the agent talks
//! to a local HTTP bridge that relays payloads onto the bus. What this
//! module owns is the seam the publisher writes through, the shared
//! connection-health flag, and the background worker that keeps that flag
//! honest without ever blocking the frame loop.

use crate::config::BusSettings;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// How often the bridge worker re-checks link health when idle.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(2);

/// Per-request timeout for bridge calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Depth of the outbound job queue. Publishes beyond this are dropped,
/// never queued against a stalled link.
const OUTBOX_DEPTH: usize = 64;

/// Bus transport error types.
#[derive(Debug)]
pub enum BusError {
    /// Configuration error
    Config(String),
    /// Network error at send time
    Network(String),
    /// Bridge returned an error response
    Server { status: u16, message: String },
    /// Outbound queue is full; the command was dropped
    Saturated,
    /// Transport has been shut down
    Closed,
}

impl std::fmt::Display for BusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusError::Config(msg) => write!(f, "bus config error: {msg}"),
            BusError::Network(msg) => write!(f, "bus network error: {msg}"),
            BusError::Server { status, message } => {
                write!(f, "bus server error ({status}): {message}")
            }
            BusError::Saturated => write!(f, "bus outbox full, command dropped"),
            BusError::Closed => write!(f, "bus transport is shut down"),
        }
    }
}

impl std::error::Error for BusError {}

/// Shared connection-health flag.
///
/// Written only by the transport's background task, read by the frame
/// loop. This is the single piece of state crossing those two schedules.
#[derive(Debug, Clone, Default)]
pub struct ConnectionHealth {
    up: Arc<AtomicBool>,
}

impl ConnectionHealth {
    pub fn new(initially_up: bool) -> Self {
        Self {
            up: Arc::new(AtomicBool::new(initially_up)),
        }
    }

    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::SeqCst)
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }
}

/// The seam the command publisher writes through.
///
/// `publish` reports only the local handoff; delivery is fire-and-forget
/// and must never stall the caller.
pub trait Transport {
    /// Hand a serialized payload to the bus for the given topic.
    fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError>;

    /// The health flag maintained by this transport.
    fn health(&self) -> ConnectionHealth;

    /// Best-effort disconnect. Not guaranteed to flush.
    fn shutdown(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        (**self).publish(topic, payload)
    }

    fn health(&self) -> ConnectionHealth {
        (**self).health()
    }

    fn shutdown(&mut self) {
        (**self).shutdown()
    }
}

/// Endpoint addressing for the HTTP bridge.
#[derive(Debug, Clone)]
pub struct BridgeEndpoints {
    settings: BusSettings,
}

impl BridgeEndpoints {
    pub fn new(settings: BusSettings) -> Self {
        Self { settings }
    }

    /// The command topic for this device identity.
    pub fn topic(&self) -> String {
        format!("robohand/{}/cmd/servo", self.settings.device_id)
    }

    fn base_url(&self) -> String {
        format!("http://{}:{}", self.settings.host, self.settings.port)
    }

    /// Publish endpoint; the topic rides in the path.
    pub fn publish_url(&self, topic: &str) -> String {
        format!("{}/v1/publish/{topic}", self.base_url())
    }

    /// Health check endpoint.
    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url())
    }
}

enum Job {
    Publish { url: String, payload: String },
    Shutdown,
}

/// HTTP bridge transport.
///
/// Owns a worker thread with a current-thread tokio runtime; `publish`
/// only enqueues. The worker POSTs payloads, polls the health endpoint on
/// a keep-alive interval, and is the sole writer of the health flag.
pub struct BridgeClient {
    endpoints: BridgeEndpoints,
    outbox: Sender<Job>,
    health: ConnectionHealth,
    worker: Option<JoinHandle<()>>,
}

impl BridgeClient {
    pub fn new(settings: BusSettings) -> Result<Self, BusError> {
        let endpoints = BridgeEndpoints::new(settings.clone());
        let health = ConnectionHealth::new(false);
        let (tx, rx) = bounded(OUTBOX_DEPTH);

        let worker_health = health.clone();
        let worker_endpoints = endpoints.clone();
        let worker = std::thread::Builder::new()
            .name("bus-bridge".to_string())
            .spawn(move || bridge_worker(worker_endpoints, settings, rx, worker_health))
            .map_err(|e| BusError::Config(format!("failed to spawn bridge worker: {e}")))?;

        Ok(Self {
            endpoints,
            outbox: tx,
            health,
            worker: Some(worker),
        })
    }

    pub fn endpoints(&self) -> &BridgeEndpoints {
        &self.endpoints
    }
}

impl Transport for BridgeClient {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        let job = Job::Publish {
            url: self.endpoints.publish_url(topic),
            payload: payload.to_string(),
        };
        match self.outbox.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(BusError::Saturated),
            Err(TrySendError::Disconnected(_)) => Err(BusError::Closed),
        }
    }

    fn health(&self) -> ConnectionHealth {
        self.health.clone()
    }

    fn shutdown(&mut self) {
        let _ = self.outbox.send(Job::Shutdown);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Worker loop: drain publish jobs, fall back to health polling when idle.
fn bridge_worker(
    endpoints: BridgeEndpoints,
    settings: BusSettings,
    jobs: Receiver<Job>,
    health: ConnectionHealth,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            warn!("bridge worker could not build runtime: {e}");
            return;
        }
    };

    let client = match reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build() {
        Ok(c) => c,
        Err(e) => {
            warn!("bridge worker could not build HTTP client: {e}");
            return;
        }
    };

    // Establish initial health before serving jobs.
    check_health(&runtime, &client, &endpoints, &health);

    loop {
        match jobs.recv_timeout(KEEPALIVE_INTERVAL) {
            Ok(Job::Publish { url, payload }) => {
                let mut request = client
                    .post(&url)
                    .header("Content-Type", "application/json")
                    .body(payload);
                if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
                    request = request.basic_auth(user, Some(pass));
                }

                match runtime.block_on(request.send()) {
                    Ok(response) if response.status().is_success() => {
                        debug!("published to {url}");
                        health.set_up(true);
                    }
                    Ok(response) => {
                        warn!("bridge rejected publish: {}", response.status());
                    }
                    Err(e) => {
                        warn!("bridge publish failed: {e}");
                        health.set_up(false);
                    }
                }
            }
            Ok(Job::Shutdown) => break,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                check_health(&runtime, &client, &endpoints, &health);
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }

    health.set_up(false);
}

fn check_health(
    runtime: &tokio::runtime::Runtime,
    client: &reqwest::Client,
    endpoints: &BridgeEndpoints,
    health: &ConnectionHealth,
) {
    let was_up = health.is_up();
    let up = runtime
        .block_on(client.get(endpoints.health_url()).send())
        .map(|r| r.status().is_success())
        .unwrap_or(false);
    if up != was_up {
        debug!("bridge link {}", if up { "up" } else { "down" });
    }
    health.set_up(up);
}

/// In-process transport recording everything published through it.
///
/// Used by the replay demo and by tests that need to observe the command
/// stream or simulate a dead link.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    health: ConnectionHealth,
    published: Arc<std::sync::Mutex<Vec<(String, String)>>>,
    fail_sends: Arc<AtomicBool>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            health: ConnectionHealth::new(true),
            published: Arc::default(),
            fail_sends: Arc::default(),
        }
    }

    /// All `(topic, payload)` pairs published so far.
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().expect("transport log poisoned").clone()
    }

    pub fn published_count(&self) -> usize {
        self.published.lock().expect("transport log poisoned").len()
    }

    /// Make subsequent sends fail at the transport layer.
    pub fn set_failing(&self, failing: bool) {
        self.fail_sends.store(failing, Ordering::SeqCst);
    }
}

impl Transport for MemoryTransport {
    fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BusError::Network("simulated send failure".to_string()));
        }
        self.published
            .lock()
            .expect("transport log poisoned")
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }

    fn health(&self) -> ConnectionHealth {
        self.health.clone()
    }

    fn shutdown(&mut self) {
        self.health.set_up(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BusSettings;

    fn settings() -> BusSettings {
        BusSettings {
            host: "127.0.0.1".to_string(),
            port: 1883,
            username: None,
            password: None,
            device_id: "robohand_test_001".to_string(),
        }
    }

    #[test]
    fn test_topic_format() {
        let endpoints = BridgeEndpoints::new(settings());
        assert_eq!(endpoints.topic(), "robohand/robohand_test_001/cmd/servo");
    }

    #[test]
    fn test_endpoint_urls() {
        let endpoints = BridgeEndpoints::new(settings());
        assert_eq!(endpoints.health_url(), "http://127.0.0.1:1883/health");
        assert_eq!(
            endpoints.publish_url("robohand/x/cmd/servo"),
            "http://127.0.0.1:1883/v1/publish/robohand/x/cmd/servo"
        );
    }

    #[test]
    fn test_health_flag_transitions() {
        let health = ConnectionHealth::new(false);
        assert!(!health.is_up());
        health.set_up(true);
        assert!(health.is_up());

        // Clones observe the same flag.
        let reader = health.clone();
        health.set_up(false);
        assert!(!reader.is_up());
    }

    #[test]
    fn test_memory_transport_records() {
        let transport = MemoryTransport::new();
        transport.publish("t", "{\"gesture\":\"fist\"}").unwrap();
        assert_eq!(transport.published_count(), 1);
        assert_eq!(transport.published()[0].0, "t");
    }

    #[test]
    fn test_memory_transport_failure_mode() {
        let transport = MemoryTransport::new();
        transport.set_failing(true);
        assert!(transport.publish("t", "{}").is_err());
        assert_eq!(transport.published_count(), 0);
    }
}
