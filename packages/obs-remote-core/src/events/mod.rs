//! Event system for subscribers of the engine.
//!
//! This module provides:
//! - [`EventEmitter`] trait the engine emits through
//! - [`BroadcastEventBridge`] fanning events out over a broadcast channel
//! - Event types for connection lifecycle and push notifications
//!
//! Delivery order equals wire arrival order. Nothing is replayed across a
//! reconnect gap; subscribers re-read the mirror after
//! [`ConnectionEvent::Established`] instead.

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::EventEmitter;

use serde::Serialize;
use serde_json::Value;

use crate::protocol::UpdateKind;

/// Events broadcast to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum RemoteEvent {
    /// Connection lifecycle and engine-level errors.
    Connection(ConnectionEvent),

    /// A recognized push notification.
    Update(UpdateEvent),
}

impl RemoteEvent {
    /// Stable event name (`connect`, `close`, `error`, or the push kind's name).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connection(event) => event.name(),
            Self::Update(event) => event.kind.event_name(),
        }
    }
}

/// Events related to the connection and the handshake.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConnectionEvent {
    /// Handshake complete; the engine is Ready and bootstrap was issued.
    Established {
        /// The websocket URL.
        url: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The socket closed (unexpectedly or by shutdown).
    Closed {
        /// True if no reconnect will follow.
        #[serde(rename = "shuttingDown")]
        shutting_down: bool,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Transport failure; a reconnect is scheduled.
    Error {
        message: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// The challenge response was rejected or could not be computed.
    AuthenticationFailed {
        message: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
    /// Reconciliation failed; the mirror was invalidated and bootstrap reissued.
    StateDesync {
        message: String,
        /// Unix timestamp in milliseconds.
        timestamp: u64,
    },
}

impl ConnectionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Established { .. } => "connect",
            Self::Closed { .. } => "close",
            Self::Error { .. } => "error",
            Self::AuthenticationFailed { .. } => "authfailed",
            Self::StateDesync { .. } => "desync",
        }
    }
}

/// A push notification with its raw payload.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateEvent {
    pub kind: UpdateKind,
    /// The complete raw push object.
    pub payload: Value,
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
}

impl From<ConnectionEvent> for RemoteEvent {
    fn from(event: ConnectionEvent) -> Self {
        RemoteEvent::Connection(event)
    }
}

impl From<UpdateEvent> for RemoteEvent {
    fn from(event: UpdateEvent) -> Self {
        RemoteEvent::Update(event)
    }
}
