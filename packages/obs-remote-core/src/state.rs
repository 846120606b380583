//! Engine configuration and connection state types.

use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::protocol_constants::{DEFAULT_PORT, EVENT_CHANNEL_CAPACITY, RECONNECT_DELAY_MS};

/// Configuration for one remote-control engine.
///
/// All fields except `host` have sensible defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Host running the streaming application.
    pub host: String,

    /// Port of the remote plugin.
    pub port: u16,

    /// Password for the challenge-response handshake, if the server requires one.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Fixed delay before each reconnect attempt (milliseconds).
    pub reconnect_delay_ms: u64,

    /// Capacity of the event broadcast channel.
    pub event_channel_capacity: usize,
}

impl Config {
    /// Creates a configuration for `host` with default values elsewhere.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Sets the handshake password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), RemoteError> {
        if self.host.trim().is_empty() {
            return Err(RemoteError::Configuration("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(RemoteError::Configuration("port must be >= 1".into()));
        }
        if self.event_channel_capacity == 0 {
            return Err(RemoteError::Configuration(
                "event_channel_capacity must be >= 1 (broadcast::channel panics on 0)".into(),
            ));
        }
        Ok(())
    }

    /// Websocket URL of the remote plugin.
    #[must_use]
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            password: None,
            reconnect_delay_ms: RECONNECT_DELAY_MS,
            event_channel_capacity: EVENT_CHANNEL_CAPACITY,
        }
    }
}

/// Lifecycle state of the single logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionState {
    /// No socket; a reconnect may be scheduled.
    #[default]
    Disconnected,
    /// Socket connect in progress.
    Connecting,
    /// Socket open, handshake query outstanding.
    Connected,
    /// Challenge response sent, awaiting verdict.
    Authenticating,
    /// Handshake complete; commands and bootstrap may flow.
    Ready,
}

impl ConnectionState {
    /// Returns true if a socket is open (requests can be transmitted).
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::Connected | Self::Authenticating | Self::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_is_sensible() {
        let config = Config::default();
        assert_eq!(config.port, 4444);
        assert_eq!(config.reconnect_delay_ms, 4000);
        assert!(config.password.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_invalid_values() {
        assert!(Config::new("").validate().is_err());
        let mut config = Config::new("obs.local");
        config.port = 0;
        assert!(config.validate().is_err());
        let mut config = Config::new("obs.local");
        config.event_channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn url_uses_host_and_port() {
        assert_eq!(Config::new("10.0.0.5").url(), "ws://10.0.0.5:4444");
    }

    #[test]
    fn only_socket_states_are_open() {
        assert!(!ConnectionState::Disconnected.is_open());
        assert!(!ConnectionState::Connecting.is_open());
        assert!(ConnectionState::Connected.is_open());
        assert!(ConnectionState::Authenticating.is_open());
        assert!(ConnectionState::Ready.is_open());
    }
}
