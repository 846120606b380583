//! Event emitter abstraction for decoupling the engine from delivery.
//!
//! The engine's callbacks depend on the [`EventEmitter`] trait rather than a
//! concrete channel, so handshake and dispatcher tests can record events
//! without a broadcast bridge.

use super::{ConnectionEvent, UpdateEvent};

/// Sink for engine events.
pub trait EventEmitter: Send + Sync {
    /// Emits a connection lifecycle event.
    fn emit_connection(&self, event: ConnectionEvent);

    /// Emits a push-notification event.
    fn emit_update(&self, event: UpdateEvent);
}
