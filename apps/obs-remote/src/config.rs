//! Client configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Client configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Host running the streaming application.
    /// Override: `OBS_REMOTE_HOST`
    pub host: String,

    /// Port of the websocket plugin.
    /// Override: `OBS_REMOTE_PORT`
    pub port: u16,

    /// Handshake password, if the server requires one.
    pub password: Option<String>,

    /// Delay before each reconnect attempt, in milliseconds.
    /// Override: `OBS_REMOTE_RECONNECT_DELAY_MS`
    pub reconnect_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let core = obs_remote_core::Config::default();
        Self {
            host: core.host,
            port: core.port,
            password: None,
            reconnect_delay_ms: core.reconnect_delay_ms,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_yaml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("OBS_REMOTE_HOST") {
            if !val.trim().is_empty() {
                self.host = val;
            }
        }

        if let Ok(val) = std::env::var("OBS_REMOTE_PORT") {
            if let Ok(port) = val.parse() {
                self.port = port;
            }
        }

        if let Ok(val) = std::env::var("OBS_REMOTE_RECONNECT_DELAY_MS") {
            if let Ok(delay) = val.parse() {
                self.reconnect_delay_ms = delay;
            }
        }

        // Note: OBS_REMOTE_PASSWORD is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to obs-remote-core's Config type.
    pub fn to_core_config(&self) -> obs_remote_core::Config {
        obs_remote_core::Config {
            host: self.host.clone(),
            port: self.port,
            password: self.password.clone(),
            reconnect_delay_ms: self.reconnect_delay_ms,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_fields_override_defaults() {
        let config = ClientConfig::from_yaml("host: studio.local\npassword: hunter2\n").unwrap();
        assert_eq!(config.host, "studio.local");
        assert_eq!(config.port, 4444);
        assert_eq!(config.password.as_deref(), Some("hunter2"));

        let core = config.to_core_config();
        assert_eq!(core.url(), "ws://studio.local:4444");
        assert!(core.validate().is_ok());
    }

    #[test]
    fn malformed_port_is_rejected() {
        assert!(ClientConfig::from_yaml("port: not-a-port").is_err());
    }
}
