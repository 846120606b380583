//! The remote-control engine.
//!
//! [`RemoteClient`] is the composition root: it owns the correlator, the
//! mirror and the event bridge, spawns the connection lifecycle task and
//! exposes the command surface.
//!
//! - `connection` - Socket lifecycle and reconnect loop
//! - `correlator` - Request ids and reply callbacks
//! - `dispatcher` - Inbound frame routing
//! - `handshake` - Authentication state machine
//! - `bootstrap` - Initial state population
//! - `commands` - Guarded user commands

mod bootstrap;
mod commands;
mod connection;
pub mod correlator;
mod dispatcher;
mod handshake;

pub use correlator::{Correlator, ReplyCallback};

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::RemoteError;
use crate::events::{BroadcastEventBridge, EventEmitter};
use crate::mirror::{Mirror, MirrorSnapshot};
use crate::protocol::{Reply, Request};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::state::{Config, ConnectionState};

/// Shared handles threaded through the engine's callbacks.
///
/// Reply callbacks run on the connection task long after the code that
/// issued the request has returned, so everything they touch lives behind
/// an `Arc` and is cloned into the callback.
#[derive(Clone)]
pub(crate) struct EngineDeps {
    pub correlator: Arc<Correlator>,
    pub mirror: Arc<Mirror>,
    pub emitter: Arc<dyn EventEmitter>,
    pub state: Arc<watch::Sender<ConnectionState>>,
    pub password: Arc<RwLock<Option<String>>>,
    /// Reason the last handshake on the open socket failed, if it did.
    pub auth_failure: Arc<Mutex<Option<String>>>,
    pub url: Arc<str>,
}

impl EngineDeps {
    pub(crate) fn new(config: &Config, emitter: Arc<dyn EventEmitter>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            correlator: Arc::new(Correlator::new()),
            mirror: Arc::new(Mirror::new()),
            emitter,
            state: Arc::new(state),
            password: Arc::new(RwLock::new(config.password.clone())),
            auth_failure: Arc::new(Mutex::new(None)),
            url: Arc::from(config.url()),
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub(crate) fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            log::debug!("[Engine] State {:?} -> {:?}", *current, next);
            *current = next;
            true
        });
    }
}

/// Client for one remote streaming application.
///
/// Created with [`RemoteClient::start`]; runs until [`RemoteClient::shutdown`].
/// Commands return `false` when their guard rejects them or no socket is
/// open; they never block and never fail loudly.
pub struct RemoteClient {
    deps: EngineDeps,
    events: BroadcastEventBridge,
    shutdown: CancellationToken,
}

impl RemoteClient {
    /// Starts the engine on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Configuration`] if `config` is invalid.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    pub fn start(config: Config) -> Result<Arc<Self>, RemoteError> {
        Self::start_with(config, &TokioSpawner::current())
    }

    /// Starts the engine, spawning its lifecycle task through `spawner`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Configuration`] if `config` is invalid.
    pub fn start_with(config: Config, spawner: &impl TaskSpawner) -> Result<Arc<Self>, RemoteError> {
        config.validate()?;
        let client = Arc::new(Self::new(&config));
        log::info!("[Engine] Starting for {}", config.url());

        let deps = client.deps.clone();
        let shutdown = client.shutdown.clone();
        spawner.spawn(connection::run(deps, config, shutdown));
        Ok(client)
    }

    /// Builds the engine without connecting.
    pub(crate) fn new(config: &Config) -> Self {
        let events = BroadcastEventBridge::new(config.event_channel_capacity.max(1));
        let deps = EngineDeps::new(config, Arc::new(events.clone()));
        Self {
            deps,
            events,
            shutdown: CancellationToken::new(),
        }
    }

    /// Event subscription surface.
    pub fn events(&self) -> &BroadcastEventBridge {
        &self.events
    }

    /// The mirror of the remote state.
    pub fn mirror(&self) -> &Mirror {
        &self.deps.mirror
    }

    /// The latest mirror snapshot.
    pub fn snapshot(&self) -> Arc<MirrorSnapshot> {
        self.deps.mirror.snapshot()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.deps.state()
    }

    /// Receiver notified on every connection state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.deps.state.subscribe()
    }

    /// Waits until the handshake completes.
    ///
    /// Returns immediately if the engine is already Ready.
    pub async fn wait_until_ready(&self) {
        let mut rx = self.deps.state.subscribe();
        // The sender is owned by `self`; the channel cannot close while we wait.
        let _ = rx.wait_for(|state| *state == ConnectionState::Ready).await;
    }

    /// Sends a raw request, invoking `callback` (if any) with the reply.
    ///
    /// Returns the assigned id, or `None` if no socket is open.
    pub fn send(&self, request: Request, callback: Option<ReplyCallback>) -> Option<u64> {
        self.deps.correlator.send(request, callback)
    }

    /// Sends a raw request and waits for the reply.
    pub async fn request(&self, request: Request) -> Result<Reply, RemoteError> {
        self.deps.correlator.request(request).await
    }

    /// Stores `password` and, if the handshake on the open socket failed,
    /// restarts it with the new password.
    ///
    /// While a handshake is still in flight the password is only stored; the
    /// pending exchange picks it up. Returns true if a handshake was restarted.
    pub fn authenticate(&self, password: impl Into<String>) -> bool {
        *self.deps.password.write() = Some(password.into());
        if self.deps.state() != ConnectionState::Connected {
            log::debug!("[Engine] Password stored for the next handshake");
            return false;
        }
        if self.deps.auth_failure.lock().take().is_none() {
            log::debug!("[Engine] Handshake in flight; password stored");
            return false;
        }
        handshake::start(&self.deps);
        true
    }

    /// Why the handshake on the open socket failed, if it did.
    ///
    /// Cleared when a new handshake starts.
    pub fn authentication_failure(&self) -> Option<String> {
        self.deps.auth_failure.lock().clone()
    }

    /// Stops the engine: closes the socket, cancels pending requests and
    /// suppresses any further reconnect.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            log::info!("[Engine] Shutdown requested");
            self.shutdown.cancel();
        }
    }

    /// True once [`RemoteClient::shutdown`] was called.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Sends a command without a callback; false if no socket is open.
    fn dispatch(&self, request: Request) -> bool {
        self.deps.correlator.send(request, None).is_some()
    }
}

impl Drop for RemoteClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Helpers for driving the engine without a socket.

    use super::*;
    use crate::protocol::update::{SceneList, StreamStats, VolumeReport};
    use crate::mirror::{Scene, Source};
    use tokio::sync::mpsc;

    /// An engine whose correlator writes into a channel instead of a socket.
    pub(crate) fn attached_client() -> (RemoteClient, mpsc::UnboundedReceiver<String>) {
        let client = RemoteClient::new(&Config::default());
        let (tx, rx) = mpsc::unbounded_channel();
        client.deps.correlator.attach(tx);
        client.deps.set_state(ConnectionState::Ready);
        (client, rx)
    }

    pub(crate) fn scene(name: &str, sources: &[(&str, bool)]) -> Scene {
        Scene {
            name: name.to_string(),
            sources: sources
                .iter()
                .map(|(name, render)| Source::new(*name, *render))
                .collect(),
        }
    }

    /// Seeds the mirror with two scenes, "Live" current.
    pub(crate) fn seed(client: &RemoteClient, streaming: bool) {
        let mirror = &client.deps.mirror;
        mirror.apply_scene_bootstrap(&SceneList {
            current_scene: Some("Live".into()),
            scenes: Some(vec![
                scene("Live", &[("Camera", true), ("Overlay", false), ("Mic", true)]),
                scene("Break", &[("Slate", true)]),
            ]),
            ..Default::default()
        });
        mirror.apply_stream_bootstrap(&StreamStats {
            streaming: Some(streaming),
            ..Default::default()
        });
        mirror.apply_volume_bootstrap(&VolumeReport {
            mic_volume: Some(0.5),
            mic_muted: Some(false),
            desktop_volume: Some(1.0),
            desktop_muted: Some(true),
            ..Default::default()
        });
    }

    /// Drains every frame sent so far.
    pub(crate) fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(serde_json::from_str(&frame).unwrap());
        }
        frames
    }
}
