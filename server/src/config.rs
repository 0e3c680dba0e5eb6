//! Controller configuration

use krushinova_shared::limits;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Spray window is empty: min {min} cm > max {max} cm")]
    SprayWindow { min: f64, max: f64 },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// HTTP listener (login)
    pub http_addr: String,
    /// Event channel listener
    pub event_addr: String,

    pub username: String,
    pub password: String,
    /// Token handed out on login and required on the event channel
    pub token: String,

    pub auth_timeout_ms: u64,
    pub send_timeout_ms: u64,
    pub telemetry_interval_ms: u64,

    pub min_spray_cm: f64,
    pub max_spray_cm: f64,
    pub obstacle_stop_cm: f64,
    pub spray_duration_ms: u64,
    pub spray_cooldown_ms: u64,

    pub confidence_threshold: f64,
    /// Detection classes that can trigger a spray
    pub target_classes: Vec<u64>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:5000".into(),
            event_addr: "0.0.0.0:5001".into(),
            username: "admin".into(),
            password: "krushinova".into(),
            token: "demo-token".into(),
            auth_timeout_ms: limits::AUTH_TIMEOUT_MS,
            send_timeout_ms: limits::SEND_TIMEOUT_MS,
            telemetry_interval_ms: limits::TELEMETRY_INTERVAL_MS,
            min_spray_cm: 20.0,
            max_spray_cm: 100.0,
            obstacle_stop_cm: 10.0,
            spray_duration_ms: 2000,
            spray_cooldown_ms: 5000,
            confidence_threshold: 0.5,
            target_classes: vec![0, 1],
        }
    }
}

impl ControllerConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        if config.min_spray_cm > config.max_spray_cm {
            return Err(ConfigError::SprayWindow {
                min: config.min_spray_cm,
                max: config.max_spray_cm,
            });
        }
        Ok(config)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms)
    }

    pub fn spray_duration(&self) -> Duration {
        Duration::from_millis(self.spray_duration_ms)
    }

    pub fn spray_cooldown(&self) -> Duration {
        Duration::from_millis(self.spray_cooldown_ms)
    }
}
