//! Operator console configuration
//!
//! Defaults match a controller running locally. A TOML file can override any
//! field, and `ROVER_API_URL` / `ROVER_EVENT_ADDR` override the file.

use crate::command::KeyReleasePolicy;
use crate::connection::SessionConfig;
use krushinova_shared::limits;
use serde::Deserialize;
use std::path::{Path, PathBuf};
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
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Base URL of the controller's HTTP service (login, video)
    pub api_url: String,
    /// Address of the controller's event channel
    pub event_addr: String,
    pub login_timeout_secs: u64,
    pub connect_timeout_ms: u64,
    pub log_capacity: usize,
    pub key_release: KeyReleasePolicy,
    /// Where the login token is kept; defaults to the user data dir
    pub token_path: Option<PathBuf>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".into(),
            event_addr: "127.0.0.1:5001".into(),
            login_timeout_secs: 10,
            connect_timeout_ms: limits::CONNECT_TIMEOUT_MS,
            log_capacity: limits::LOG_CAPACITY,
            key_release: KeyReleasePolicy::default(),
            token_path: None,
        }
    }
}

impl ConsoleConfig {
    /// Load from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ROVER_API_URL") {
            self.api_url = url;
        }
        if let Some(addr) = lookup("ROVER_EVENT_ADDR") {
            self.event_addr = addr;
        }
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            ..SessionConfig::default()
        }
    }

    /// Address of the live video resource, fetched independently of the session
    pub fn video_feed_url(&self) -> String {
        format!("{}/video_feed", self.api_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.log_capacity, 5);
        assert_eq!(config.key_release, KeyReleasePolicy::Ignore);
        assert_eq!(config.video_feed_url(), "http://localhost:5000/video_feed");
    }

    #[test]
    fn test_partial_toml() {
        let config = ConsoleConfig::from_toml(
            r#"
            api_url = "http://rover.local:5000/"
            key_release = "stop"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_url, "http://rover.local:5000/");
        assert_eq!(config.video_feed_url(), "http://rover.local:5000/video_feed");
        assert_eq!(config.key_release, KeyReleasePolicy::Stop);
        assert_eq!(config.event_addr, "127.0.0.1:5001");
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            ConsoleConfig::from_toml("log_capacity = \"five\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ConsoleConfig::default();
        config.apply_env(|key| match key {
            "ROVER_EVENT_ADDR" => Some("10.0.0.7:5001".to_string()),
            _ => None,
        });
        assert_eq!(config.event_addr, "10.0.0.7:5001");
        assert_eq!(config.api_url, "http://localhost:5000");
    }

    #[test]
    fn test_session_config() {
        let config = ConsoleConfig {
            connect_timeout_ms: 250,
            ..Default::default()
        };
        assert_eq!(
            config.session_config().connect_timeout,
            Duration::from_millis(250)
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConsoleConfig::load(Some(Path::new("/nonexistent/console.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
