//! Robohand Agent CLI
//!
//! Bridges an external hand-landmark detector to Robohand servo commands.

use clap::{Parser, Subcommand};
use robohand_agent::{
    bus::{BridgeClient, BridgeEndpoints, MemoryTransport, Transport},
    config::Config,
    core::{FINGER_NAMES, GESTURE_TEMPLATES},
    publisher::CommandPublisher,
    session::{ControlMode, FrameOutcome, HandPipeline},
    tracker::{ControlCommand, LandmarkReader, TrackerEvent},
    VERSION,
};
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "robohand-agent")]
#[command(author = "Robohand")]
#[command(version = VERSION)]
#[command(about = "Hand-pose to servo command bridge for the Robohand", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the frame loop against a detector stream
    Start {
        /// Read detector frames from a file instead of stdin
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Start in raw mode (publish bend vectors, not gestures)
        #[arg(long)]
        raw: bool,

        /// Bus bridge host
        #[arg(long)]
        host: Option<String>,

        /// Bus bridge port
        #[arg(long)]
        port: Option<u16>,

        /// Bridge username
        #[arg(long)]
        username: Option<String>,

        /// Bridge password
        #[arg(long)]
        password: Option<String>,

        /// Device identity scoping the command topic
        #[arg(long)]
        device_id: Option<String>,

        /// Smoothing window size override
        #[arg(long)]
        window: Option<usize>,

        /// Gesture match threshold override
        #[arg(long)]
        threshold: Option<f64>,

        /// Update rate override (Hz)
        #[arg(long)]
        rate: Option<f64>,

        /// Print commands instead of sending them to the bridge
        #[arg(long)]
        dry_run: bool,
    },

    /// Publish a single neutral command and exit
    Neutral {
        /// Bus bridge host
        #[arg(long)]
        host: Option<String>,

        /// Bus bridge port
        #[arg(long)]
        port: Option<u16>,

        /// Device identity scoping the command topic
        #[arg(long)]
        device_id: Option<String>,
    },

    /// List the built-in gesture templates
    Templates,

    /// Show configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("robohand_agent=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Start {
            input,
            raw,
            host,
            port,
            username,
            password,
            device_id,
            window,
            threshold,
            rate,
            dry_run,
        } => {
            let mut config = load_config();
            if let Some(host) = host {
                config.bus.host = host;
            }
            if let Some(port) = port {
                config.bus.port = port;
            }
            config.bus.username = username.or(config.bus.username);
            config.bus.password = password.or(config.bus.password);
            if let Some(device_id) = device_id {
                config.bus.device_id = device_id;
            }
            if let Some(window) = window {
                config.smoothing_window = window;
            }
            if let Some(threshold) = threshold {
                config.gesture_threshold = threshold;
            }
            if let Some(rate) = rate {
                config.update_rate_hz = rate;
            }
            cmd_start(config, input, raw, dry_run)
        }
        Commands::Neutral {
            host,
            port,
            device_id,
        } => {
            let mut config = load_config();
            if let Some(host) = host {
                config.bus.host = host;
            }
            if let Some(port) = port {
                config.bus.port = port;
            }
            if let Some(device_id) = device_id {
                config.bus.device_id = device_id;
            }
            cmd_neutral(config)
        }
        Commands::Templates => {
            cmd_templates();
            Ok(())
        }
        Commands::Config { init } => cmd_config(init),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: could not load config, using defaults: {e}");
            Config::default()
        }
    }
}

fn cmd_start(
    config: Config,
    input: Option<PathBuf>,
    raw: bool,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let mode = if raw {
        ControlMode::Raw
    } else {
        ControlMode::Gesture
    };

    println!("Robohand Agent v{VERSION}");
    println!("  Mode: {mode}");
    println!("  Smoothing window: {} frames", config.smoothing_window);
    println!("  Update rate: {} Hz", config.update_rate_hz);
    println!("  Device ID: {}", config.bus.device_id);

    let min_interval = config.min_update_interval();
    let topic = BridgeEndpoints::new(config.bus.clone()).topic();

    let mut pipeline: HandPipeline<Box<dyn Transport + Send>> = if dry_run {
        println!("  Transport: dry run (commands printed, not sent)");
        let transport = MemoryTransport::new();
        let publisher = CommandPublisher::new(
            Box::new(transport) as Box<dyn Transport + Send>,
            topic,
            min_interval,
        );
        HandPipeline::new(config.clone(), mode, publisher)
    } else {
        println!("  Bridge: {}:{}", config.bus.host, config.bus.port);
        println!("  Topic: {topic}");
        let transport = BridgeClient::new(config.bus.clone())?;
        let publisher = CommandPublisher::new(
            Box::new(transport) as Box<dyn Transport + Send>,
            topic,
            min_interval,
        );
        HandPipeline::new(config.clone(), mode, publisher)
    };

    println!();
    println!("Reading detector frames from {}", match &input {
        Some(path) => format!("{path:?}"),
        None => "stdin".to_string(),
    });
    println!("Press Ctrl+C to stop");
    println!();

    let mut reader = match input {
        Some(path) => LandmarkReader::spawn(BufReader::new(std::fs::File::open(path)?)),
        None => LandmarkReader::spawn(BufReader::new(std::io::stdin())),
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let mut frames: u64 = 0;
    let mut published: u64 = 0;

    // Main frame loop
    while running.load(Ordering::SeqCst) {
        match reader.receiver().recv_timeout(Duration::from_millis(100)) {
            Ok(TrackerEvent::Hand { landmarks, .. }) => {
                frames += 1;
                match pipeline.process_hand(&landmarks, Instant::now()) {
                    FrameOutcome::Published(command) => {
                        published += 1;
                        let payload = command.to_payload().unwrap_or_default();
                        println!("[{}] {payload}", status_tag(&pipeline));
                    }
                    FrameOutcome::PublishFailed(reason) => {
                        eprintln!("[{}] publish failed: {reason}", status_tag(&pipeline));
                    }
                    // Warming, rate-limited, unchanged, invalid: local only.
                    _ => {}
                }
            }
            Ok(TrackerEvent::NoHand { .. }) => {
                pipeline.process_no_hand();
            }
            Ok(TrackerEvent::Control(ControlCommand::ToggleMode)) => {
                let mode = pipeline.toggle_mode();
                println!("Switched to {mode} mode");
            }
            Ok(TrackerEvent::Control(ControlCommand::Reset)) => {
                match pipeline.reset_neutral() {
                    Ok(()) => println!("Reset to neutral position"),
                    Err(e) => eprintln!("Reset failed: {e}"),
                }
            }
            Ok(TrackerEvent::Control(ControlCommand::Quit)) => {
                println!("Quit requested");
                break;
            }
            Ok(TrackerEvent::StreamEnded) => {
                println!("Detector stream ended");
                break;
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                eprintln!("Reader disconnected unexpectedly");
                break;
            }
        }
    }

    // Orderly shutdown: stop the reader, release the transport.
    println!();
    println!("Stopping...");
    reader.stop();
    pipeline.shutdown();

    println!("Processed {frames} hand frames, published {published} commands");
    Ok(())
}

fn status_tag<T: Transport>(pipeline: &HandPipeline<T>) -> String {
    format!(
        "{} {}",
        pipeline.mode(),
        if pipeline.connected() { "up" } else { "down" }
    )
}

fn cmd_neutral(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let topic = BridgeEndpoints::new(config.bus.clone()).topic();
    let transport = BridgeClient::new(config.bus)?;

    // Give the bridge worker a moment to establish link health.
    std::thread::sleep(Duration::from_millis(300));

    let mut publisher = CommandPublisher::new(transport, topic, Duration::ZERO);
    publisher.force_publish(&robohand_agent::OutboundCommand::neutral())?;
    println!("Neutral command published");

    publisher.shutdown();
    Ok(())
}

fn cmd_templates() {
    println!("Gesture templates (threshold applies to Euclidean distance):");
    println!();
    println!("  {:<10} {}", "name", FINGER_NAMES.join(" / "));
    for template in &GESTURE_TEMPLATES {
        println!("  {:<10} {}", template.name, template.bends);
    }
}

fn cmd_config(init: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config();

    if init {
        config.save()?;
        println!("Wrote {:?}", Config::config_path());
        println!();
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
    Ok(())
}
