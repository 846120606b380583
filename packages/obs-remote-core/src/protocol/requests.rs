//! Pure request builders.
//!
//! No function here touches the connection or the mirror; redundancy guards
//! live on [`crate::client::RemoteClient`].

use crate::mirror::AudioChannel;
use crate::protocol::Request;
use crate::protocol_constants::{
    REQ_AUTHENTICATE, REQ_GET_AUTH_REQUIRED, REQ_GET_SCENE_LIST, REQ_GET_STREAMING_STATUS,
    REQ_GET_VOLUMES, REQ_SET_CURRENT_SCENE, REQ_SET_SOURCE_ORDER, REQ_SET_SOURCE_RENDER,
    REQ_SET_VOLUME, REQ_START_STOP_STREAMING, REQ_TOGGLE_MUTE,
};

pub fn get_auth_required() -> Request {
    Request::new(REQ_GET_AUTH_REQUIRED)
}

pub fn authenticate(auth: &str) -> Request {
    Request::new(REQ_AUTHENTICATE).field("auth", auth)
}

pub fn get_streaming_status() -> Request {
    Request::new(REQ_GET_STREAMING_STATUS)
}

pub fn get_scene_list() -> Request {
    Request::new(REQ_GET_SCENE_LIST)
}

pub fn get_volumes() -> Request {
    Request::new(REQ_GET_VOLUMES)
}

/// Flips the mute flag of `channel`; the protocol has no absolute mute.
pub fn toggle_mute(channel: AudioChannel) -> Request {
    Request::new(REQ_TOGGLE_MUTE).field("channel", channel.as_str())
}

/// Sets the volume of `channel`.
///
/// `is_final` is false for live drag updates and true for the committed value.
pub fn set_volume(channel: AudioChannel, volume: f64, is_final: bool) -> Request {
    Request::new(REQ_SET_VOLUME)
        .field("volume", volume)
        .field("channel", channel.as_str())
        .field("final", is_final)
}

/// Toggles the full broadcast.
pub fn start_stop_streaming() -> Request {
    Request::new(REQ_START_STOP_STREAMING)
}

/// Toggles preview-only mode.
pub fn start_stop_preview() -> Request {
    Request::new(REQ_START_STOP_STREAMING).field("preview-only", true)
}

pub fn set_current_scene(name: &str) -> Request {
    Request::new(REQ_SET_CURRENT_SCENE).field("scene-name", name)
}

pub fn set_source_render(source: &str, render: bool) -> Request {
    Request::new(REQ_SET_SOURCE_RENDER)
        .field("source", source)
        .field("render", render)
}

pub fn set_source_order<S: AsRef<str>>(names: &[S]) -> Request {
    let names: Vec<serde_json::Value> = names
        .iter()
        .map(|n| serde_json::Value::String(n.as_ref().to_string()))
        .collect();
    Request::new(REQ_SET_SOURCE_ORDER).field("scene-names", names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_volume_carries_final_flag() {
        let req = set_volume(AudioChannel::Desktop, 0.5, true);
        assert_eq!(req.request_type(), "SetVolume");
        assert_eq!(req.get("channel"), Some(&json!("desktop")));
        assert_eq!(req.get("volume"), Some(&json!(0.5)));
        assert_eq!(req.get("final"), Some(&json!(true)));
    }

    #[test]
    fn preview_toggle_is_flagged_preview_only() {
        assert_eq!(start_stop_preview().get("preview-only"), Some(&json!(true)));
        assert_eq!(start_stop_streaming().get("preview-only"), None);
    }

    #[test]
    fn source_order_uses_scene_names_field() {
        let req = set_source_order(&["C", "A", "B"]);
        assert_eq!(req.get("scene-names"), Some(&json!(["C", "A", "B"])));
    }
}
