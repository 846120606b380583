//! Initial population of the mirror.
//!
//! Issued exactly once per successful handshake, and again after a state
//! desync. Each reply fills one part of the mirror; the mirror reports itself
//! valid once all three have arrived.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::EngineDeps;
use crate::error::RemoteError;
use crate::events::{EventEmitter, UpdateEvent};
use crate::mirror::Mirror;
use crate::protocol::update::{SceneList, StreamStats, VolumeReport};
use crate::protocol::{requests, Reply, UpdateKind};
use crate::utils::now_millis;

/// Invalidates the mirror and requests stream status, scenes and volumes.
pub(crate) fn request_all(deps: &EngineDeps) {
    deps.mirror.invalidate();
    log::info!("[Bootstrap] Requesting initial state");

    let mirror = Arc::clone(&deps.mirror);
    let emitter = Arc::clone(&deps.emitter);
    deps.correlator
        .send_with(requests::get_streaming_status(), move |result| {
            if let Some(stats) = decode::<StreamStats>(result) {
                apply_stream_status(&mirror, emitter.as_ref(), stats);
            }
        });

    request_scenes(deps);

    let mirror = Arc::clone(&deps.mirror);
    deps.correlator
        .send_with(requests::get_volumes(), move |result| {
            if let Some(report) = decode::<VolumeReport>(result) {
                mirror.apply_volume_bootstrap(&report);
            }
        });
}

/// Requests the scene list alone.
pub(crate) fn request_scenes(deps: &EngineDeps) {
    let mirror = Arc::clone(&deps.mirror);
    deps.correlator
        .send_with(requests::get_scene_list(), move |result| {
            if let Some(list) = decode::<SceneList>(result) {
                mirror.apply_scene_bootstrap(&list);
            }
        });
}

/// Applies a stream-status reply, announcing a start or stop the engine
/// missed while it was not watching.
fn apply_stream_status(mirror: &Mirror, emitter: &dyn EventEmitter, stats: StreamStats) {
    let was_active = mirror.snapshot().stream.is_active();
    mirror.apply_stream_bootstrap(&stats);
    let is_active = mirror.snapshot().stream.is_active();

    if was_active == is_active {
        return;
    }
    let kind = if is_active {
        UpdateKind::StreamStarting
    } else {
        UpdateKind::StreamStopping
    };
    log::info!("[Bootstrap] Output changed while away: {}", kind.event_name());

    let mut payload = serde_json::to_value(&stats).unwrap_or(Value::Null);
    if let Value::Object(object) = &mut payload {
        object.insert("update-type".into(), Value::String(kind.update_type().into()));
    }
    emitter.emit_update(UpdateEvent {
        kind,
        payload,
        timestamp: now_millis(),
    });
}

/// Extracts a typed payload from a bootstrap reply, logging failures.
fn decode<T: DeserializeOwned>(result: Result<Reply, RemoteError>) -> Option<T> {
    let reply = match result.and_then(Reply::into_result) {
        Ok(reply) => reply,
        Err(RemoteError::Cancelled(_)) | Err(RemoteError::NotConnected) => return None,
        Err(e) => {
            log::warn!("[Bootstrap] Request failed: {}", e);
            return None;
        }
    };
    match T::deserialize(&reply.payload) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!(
                "[Bootstrap] Malformed {} reply: {}",
                reply.request_type,
                e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{BroadcastEventBridge, RemoteEvent};
    use crate::protocol::Frame;
    use crate::state::Config;
    use serde_json::json;
    use tokio::sync::mpsc;

    fn harness() -> (EngineDeps, BroadcastEventBridge, mpsc::UnboundedReceiver<String>) {
        let bridge = BroadcastEventBridge::new(16);
        let deps = EngineDeps::new(&Config::default(), Arc::new(bridge.clone()));
        let (tx, rx) = mpsc::unbounded_channel();
        deps.correlator.attach(tx);
        (deps, bridge, rx)
    }

    /// Answers every outstanding frame with the body chosen by request type.
    fn answer_all(deps: &EngineDeps, rx: &mut mpsc::UnboundedReceiver<String>, streaming: bool) {
        while let Ok(frame) = rx.try_recv() {
            let request: Value = serde_json::from_str(&frame).unwrap();
            let mut body = match request["request-type"].as_str().unwrap() {
                "GetStreamingStatus" => json!({"streaming": streaming, "preview-only": false}),
                "GetSceneList" => json!({
                    "current-scene": "Live",
                    "scenes": [{"name": "Live", "sources": [{"name": "Cam", "render": true}]}]
                }),
                "GetVolumes" => json!({"mic-volume": 0.4, "mic-muted": false,
                                       "desktop-volume": 0.9, "desktop-muted": true}),
                other => panic!("unexpected request {other}"),
            };
            body["message-id"] = request["message-id"].clone();
            body["status"] = json!("ok");
            let Frame::Reply(reply) = Frame::parse(&body.to_string()).unwrap() else {
                panic!("expected reply");
            };
            deps.correlator.resolve(reply);
        }
    }

    #[test]
    fn bootstrap_populates_every_part() {
        let (deps, _bridge, mut rx) = harness();
        request_all(&deps);
        assert!(!deps.mirror.snapshot().is_valid());

        answer_all(&deps, &mut rx, false);

        let snapshot = deps.mirror.snapshot();
        assert!(snapshot.is_valid());
        assert_eq!(snapshot.current_scene.as_deref(), Some("Live"));
        assert_eq!(snapshot.sources()[0].name, "Cam");
        assert_eq!(snapshot.volumes.microphone.volume, Some(0.4));
        assert_eq!(snapshot.volumes.desktop.muted, Some(true));
        assert!(!snapshot.stream.streaming);
    }

    #[test]
    fn stream_change_while_away_is_replayed_as_event() {
        let (deps, bridge, mut rx) = harness();
        let mut events = bridge.subscribe();

        request_all(&deps);
        answer_all(&deps, &mut rx, true);

        let RemoteEvent::Update(event) = events.try_recv().unwrap() else {
            panic!("expected update event");
        };
        assert_eq!(event.kind, UpdateKind::StreamStarting);
        assert_eq!(event.payload["update-type"], "StreamStarting");

        // Unchanged on the next bootstrap: no replay.
        request_all(&deps);
        answer_all(&deps, &mut rx, true);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn error_reply_leaves_part_missing() {
        let (deps, _bridge, mut rx) = harness();
        request_scenes(&deps);
        let request: Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        let text = json!({"message-id": request["message-id"], "status": "error", "error": "busy"});
        let Frame::Reply(reply) = Frame::parse(&text.to_string()).unwrap() else {
            panic!("expected reply");
        };
        deps.correlator.resolve(reply);
        assert!(!deps.mirror.snapshot().bootstrap.scenes);
    }
}
