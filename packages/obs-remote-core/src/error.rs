//! Centralized error types for the OBS remote core library.
//!
//! Every failure the engine can observe maps onto one [`RemoteError`]
//! variant. None of them are fatal: transport errors feed the reconnect loop,
//! protocol errors drop a single frame, and the rest are surfaced to the
//! request's own caller or through the event bridge.

use serde::Serialize;
use thiserror::Error;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for events and logs.
    fn code(&self) -> &'static str;
}

/// Application-wide error type for the remote-control engine.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum RemoteError {
    /// Transport failure (connect refused, socket reset, write failed).
    ///
    /// Recovered automatically by the scheduled reconnect.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Inbound frame was not JSON or did not match the wire format.
    ///
    /// The frame is dropped; the connection stays open.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server answered a request with `status: "error"`.
    #[error("Request {request_type} failed: {message}")]
    Request {
        /// The `request-type` that was rejected.
        request_type: String,
        /// The server-supplied `error` text.
        message: String,
    },

    /// The challenge-response exchange was rejected or could not be answered.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A reconciliation step referenced entities the mirror does not hold.
    #[error("State desync: {0}")]
    StateDesync(String),

    /// The request was dropped because no socket was open.
    #[error("Not connected")]
    NotConnected,

    /// The request was outstanding when its connection was torn down.
    #[error("Request cancelled: {0}")]
    Cancelled(String),

    /// Invalid configuration values.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ErrorCode for RemoteError {
    fn code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection_error",
            Self::Protocol(_) => "protocol_error",
            Self::Request { .. } => "request_error",
            Self::Authentication(_) => "authentication_error",
            Self::StateDesync(_) => "state_desync",
            Self::NotConnected => "not_connected",
            Self::Cancelled(_) => "cancelled",
            Self::Configuration(_) => "configuration_error",
        }
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RemoteError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

/// Convenient Result alias for engine operations.
pub type RemoteResult<T> = Result<T, RemoteError>;
