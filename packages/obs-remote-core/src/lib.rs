//! OBS Remote Core - client engine for the OBS websocket remote-control protocol.
//!
//! This crate keeps one persistent websocket to a streaming application,
//! authenticates with its challenge-response handshake, correlates replies
//! to requests, and folds unsolicited push notifications into a local
//! mirror of the remote state (scenes, sources, volumes, stream status).
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`client`]: The engine: lifecycle, correlation, dispatch and commands
//! - [`mirror`]: Versioned snapshots of the remote state and reconciliation
//! - [`protocol`]: Wire frames, request builders and push payloads
//! - [`events`]: Event system for subscribers
//! - [`runtime`]: Task spawning abstraction for async runtime independence
//! - [`state`]: Engine configuration and connection state
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning the lifecycle task
//! - [`EventEmitter`](events::EventEmitter): Delivering engine events
//!
//! Each trait has a default implementation used by [`RemoteClient::start`].

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod events;
pub mod mirror;
pub mod protocol;
pub mod protocol_constants;
pub mod runtime;
pub mod state;
pub mod utils;

// Re-export commonly used types at the crate root
pub use client::{RemoteClient, ReplyCallback};
pub use error::{ErrorCode, RemoteError, RemoteResult};
pub use events::{BroadcastEventBridge, ConnectionEvent, EventEmitter, RemoteEvent, UpdateEvent};
pub use mirror::{
    AudioChannel, ChannelVolume, Mirror, MirrorSnapshot, Scene, Source, StreamStatus, VolumeState,
};
pub use protocol::{Reply, ReplyStatus, Request, Update, UpdateKind};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use state::{Config, ConnectionState};
pub use utils::now_millis;
