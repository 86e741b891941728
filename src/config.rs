//! Configuration for the Robohand agent.
//!
//! Every tunable the pipeline reads lives here and is handed to each
//! component at construction. Nothing consults these values through
//! globals, so tests can run the pipeline with arbitrary parameters.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of frames averaged by the temporal smoother
    pub smoothing_window: usize,

    /// Maximum Euclidean distance for a gesture template match
    pub gesture_threshold: f64,

    /// Maximum command publication rate in Hz
    pub update_rate_hz: f64,

    /// Message-bus bridge settings
    pub bus: BusSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smoothing_window: 5,
            gesture_threshold: 0.3,
            update_rate_hz: 30.0,
            bus: BusSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location. A missing file is not
    /// an error; defaults apply until the first save.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from the given file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to the given file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("robohand-agent")
            .join("config.json")
    }

    /// Minimum interval between published commands.
    pub fn min_update_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.update_rate_hz)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smoothing_window == 0 {
            return Err(ConfigError::Invalid(
                "smoothing_window must be at least 1".to_string(),
            ));
        }
        if self.gesture_threshold.is_nan() || self.gesture_threshold <= 0.0 {
            return Err(ConfigError::Invalid(
                "gesture_threshold must be positive".to_string(),
            ));
        }
        if self.update_rate_hz.is_nan() || self.update_rate_hz <= 0.0 {
            return Err(ConfigError::Invalid(
                "update_rate_hz must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Message-bus bridge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusSettings {
    /// Bridge host
    pub host: String,
    /// Bridge port
    pub port: u16,
    /// Optional username for bridge authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Optional password for bridge authentication
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Device identity; scopes the command topic
    pub device_id: String,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            device_id: default_device_id(),
        }
    }
}

/// Derive a stable-ish device id from the hostname plus a short random
/// suffix, for hosts running more than one agent.
pub fn default_device_id() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    format!(
        "robohand-{}-{}",
        host,
        &uuid::Uuid::new_v4().to_string()[..8]
    )
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.smoothing_window, 5);
        assert_eq!(config.gesture_threshold, 0.3);
        assert_eq!(config.update_rate_hz, 30.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_min_update_interval() {
        let config = Config {
            update_rate_hz: 30.0,
            ..Default::default()
        };
        let interval = config.min_update_interval();
        assert!((interval.as_secs_f64() - 1.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_validation_rejects_zero_window() {
        let config = Config {
            smoothing_window: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_rate() {
        let config = Config {
            update_rate_hz: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.smoothing_window, config.smoothing_window);
        assert_eq!(parsed.bus.host, config.bus.host);
        assert_eq!(parsed.bus.device_id, config.bus.device_id);
    }

    #[test]
    fn test_save_and_load_file_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "robohand-config-test-{}.json",
            uuid::Uuid::new_v4()
        ));

        let config = Config {
            smoothing_window: 9,
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.smoothing_window, 9);
        assert_eq!(loaded.bus.device_id, config.bus.device_id);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!(
            "robohand-config-test-{}.json",
            uuid::Uuid::new_v4()
        ));

        let config = Config {
            update_rate_hz: 0.0,
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Invalid(_))
        ));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_device_id_prefix() {
        assert!(default_device_id().starts_with("robohand-"));
    }
}
