//! Bridge implementation that maps engine events to a broadcast channel.
//!
//! The [`BroadcastEventBridge`] implements [`EventEmitter`] by forwarding
//! every event to a `tokio::sync::broadcast` channel. Subscribers either take
//! the whole event feed or a per-kind filtered stream.

use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use super::emitter::EventEmitter;
use super::{ConnectionEvent, RemoteEvent, UpdateEvent};
use crate::protocol::UpdateKind;

/// Bridges engine events to a broadcast channel.
#[derive(Clone)]
pub struct BroadcastEventBridge {
    tx: broadcast::Sender<RemoteEvent>,
}

impl BroadcastEventBridge {
    /// Creates a new bridge with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    fn broadcast(&self, event: RemoteEvent) {
        if let Err(e) = self.tx.send(event) {
            log::trace!("[EventBridge] No broadcast receivers: {}", e);
        }
    }

    /// Returns a new receiver for every event.
    pub fn subscribe(&self) -> broadcast::Receiver<RemoteEvent> {
        self.tx.subscribe()
    }

    /// Returns a stream of connection lifecycle events only.
    pub fn connection_events(&self) -> impl Stream<Item = ConnectionEvent> + Send + 'static {
        live_stream(self.tx.subscribe()).filter_map(|event| match event {
            RemoteEvent::Connection(event) => Some(event),
            RemoteEvent::Update(_) => None,
        })
    }

    /// Returns a stream of push notifications of one kind.
    pub fn updates(&self, kind: UpdateKind) -> impl Stream<Item = UpdateEvent> + Send + 'static {
        live_stream(self.tx.subscribe()).filter_map(move |event| match event {
            RemoteEvent::Update(event) if event.kind == kind => Some(event),
            _ => None,
        })
    }
}

/// Wraps a receiver, skipping over lag gaps instead of ending the stream.
fn live_stream(
    rx: broadcast::Receiver<RemoteEvent>,
) -> impl Stream<Item = RemoteEvent> + Send + 'static {
    BroadcastStream::new(rx).filter_map(|res| match res {
        Ok(event) => Some(event),
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            log::warn!("[EventBridge] Subscriber lagged, {} event(s) dropped", n);
            None
        }
    })
}

impl EventEmitter for BroadcastEventBridge {
    fn emit_connection(&self, event: ConnectionEvent) {
        self.broadcast(RemoteEvent::Connection(event));
    }

    fn emit_update(&self, event: UpdateEvent) {
        self.broadcast(RemoteEvent::Update(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(kind: UpdateKind) -> UpdateEvent {
        UpdateEvent {
            kind,
            payload: json!({ "update-type": kind.update_type() }),
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn per_kind_stream_filters_other_kinds() {
        let bridge = BroadcastEventBridge::new(16);
        let mut scenes = Box::pin(bridge.updates(UpdateKind::SwitchScenes));

        bridge.emit_update(update(UpdateKind::VolumeChanged));
        bridge.emit_connection(ConnectionEvent::Closed {
            shutting_down: false,
            timestamp: 0,
        });
        bridge.emit_update(update(UpdateKind::SwitchScenes));

        let event = scenes.next().await.unwrap();
        assert_eq!(event.kind, UpdateKind::SwitchScenes);
    }

    #[tokio::test]
    async fn connection_stream_skips_updates() {
        let bridge = BroadcastEventBridge::new(16);
        let mut connection = Box::pin(bridge.connection_events());

        bridge.emit_update(update(UpdateKind::SwitchScenes));
        bridge.emit_connection(ConnectionEvent::AuthenticationFailed {
            message: "Authentication Failed.".into(),
            timestamp: 0,
        });

        let event = connection.next().await.unwrap();
        assert_eq!(event.name(), "authfailed");
    }

    #[tokio::test]
    async fn events_arrive_in_emission_order() {
        let bridge = BroadcastEventBridge::new(16);
        let mut rx = bridge.subscribe();

        bridge.emit_update(update(UpdateKind::StreamStarting));
        bridge.emit_update(update(UpdateKind::StreamStatus));
        bridge.emit_update(update(UpdateKind::StreamStopping));

        assert_eq!(rx.recv().await.unwrap().name(), "start");
        assert_eq!(rx.recv().await.unwrap().name(), "status");
        assert_eq!(rx.recv().await.unwrap().name(), "stop");
    }

    #[test]
    fn emitting_without_subscribers_is_harmless() {
        let bridge = BroadcastEventBridge::new(4);
        bridge.emit_update(update(UpdateKind::VolumeChanged));
    }
}
