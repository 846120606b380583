//! Push-notification payloads.
//!
//! Pushes decode into the closed [`Update`] union keyed by their
//! `update-type`. An unknown discriminator decodes to [`Update::Unhandled`]
//! so newer servers never break older clients.
//!
//! The payload structs double as the shapes of the matching bootstrap
//! replies (`GetStreamingStatus`, `GetSceneList`, `GetVolumes`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RemoteError;
use crate::mirror::{Scene, Source};
use crate::protocol_constants::{
    UPD_REPOPULATE_SOURCES, UPD_SCENES_CHANGED, UPD_SOURCE_CHANGED, UPD_SOURCE_ORDER_CHANGED,
    UPD_STREAM_STARTING, UPD_STREAM_STATUS, UPD_STREAM_STOPPING, UPD_SWITCH_SCENES,
    UPD_VOLUME_CHANGED,
};

/// Periodic streaming statistics (also the `GetStreamingStatus` reply).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StreamStats {
    pub streaming: Option<bool>,
    pub preview_only: Option<bool>,
    pub bytes_per_sec: Option<u64>,
    pub fps: Option<f64>,
    pub strain: Option<f64>,
    pub num_dropped_frames: Option<u64>,
    pub num_total_frames: Option<u64>,
    pub total_stream_time: Option<u64>,
}

/// Payload of `StreamStarting` / `StreamStopping`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StreamTransition {
    pub preview_only: bool,
}

/// Scene selection and/or scene list (also the `GetSceneList` reply).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SceneList {
    /// Name of the newly selected scene (`SwitchScenes`).
    pub scene_name: Option<String>,
    /// Name of the current scene (`GetSceneList`, some `ScenesChanged`).
    pub current_scene: Option<String>,
    /// Full scene list, when the frame carries one.
    pub scenes: Option<Vec<Scene>>,
}

impl SceneList {
    /// The selected scene name, preferring the switch target.
    pub fn selected(&self) -> Option<&str> {
        self.scene_name
            .as_deref()
            .or(self.current_scene.as_deref())
    }
}

/// New ordering of the active scene's sources, by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SourceOrder {
    pub sources: Vec<String>,
}

/// Wholesale replacement of one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SourceReplacement {
    pub source_name: String,
    pub source: Source,
}

/// Wholesale replacement of the active source list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SourceList {
    pub sources: Vec<Source>,
}

/// Volume report, either channel-scoped or flat (also the `GetVolumes` reply).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct VolumeReport {
    /// Channel-scoped form: `microphone` or `desktop`.
    pub channel: Option<String>,
    pub volume: Option<f64>,
    pub muted: Option<bool>,
    /// Flat form.
    pub mic_volume: Option<f64>,
    pub mic_muted: Option<bool>,
    pub desktop_volume: Option<f64>,
    pub desktop_muted: Option<bool>,
}

/// Closed union of push payloads keyed by `update-type`.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    StreamStatus(StreamStats),
    StreamStarting(StreamTransition),
    StreamStopping(StreamTransition),
    SwitchScenes(SceneList),
    ScenesChanged(SceneList),
    SourceOrderChanged(SourceOrder),
    SourceChanged(SourceReplacement),
    RepopulateSources(SourceList),
    VolumeChanged(VolumeReport),
    /// A discriminator this client does not know.
    Unhandled(String),
}

impl Update {
    /// Decodes the payload of a push whose discriminator is `update_type`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Protocol`] if a recognized kind carries a
    /// payload of the wrong shape.
    pub fn decode(update_type: &str, payload: &Value) -> Result<Self, RemoteError> {
        let Some(kind) = UpdateKind::from_update_type(update_type) else {
            return Ok(Self::Unhandled(update_type.to_string()));
        };
        let update = match kind {
            UpdateKind::StreamStatus => Self::StreamStatus(from_payload(payload)?),
            UpdateKind::StreamStarting => Self::StreamStarting(from_payload(payload)?),
            UpdateKind::StreamStopping => Self::StreamStopping(from_payload(payload)?),
            UpdateKind::SwitchScenes => Self::SwitchScenes(from_payload(payload)?),
            UpdateKind::ScenesChanged => Self::ScenesChanged(from_payload(payload)?),
            UpdateKind::SourceOrderChanged => Self::SourceOrderChanged(from_payload(payload)?),
            UpdateKind::SourceChanged => Self::SourceChanged(from_payload(payload)?),
            UpdateKind::RepopulateSources => Self::RepopulateSources(from_payload(payload)?),
            UpdateKind::VolumeChanged => Self::VolumeChanged(from_payload(payload)?),
        };
        Ok(update)
    }

    /// The recognized kind, or `None` for [`Update::Unhandled`].
    pub fn kind(&self) -> Option<UpdateKind> {
        match self {
            Self::StreamStatus(_) => Some(UpdateKind::StreamStatus),
            Self::StreamStarting(_) => Some(UpdateKind::StreamStarting),
            Self::StreamStopping(_) => Some(UpdateKind::StreamStopping),
            Self::SwitchScenes(_) => Some(UpdateKind::SwitchScenes),
            Self::ScenesChanged(_) => Some(UpdateKind::ScenesChanged),
            Self::SourceOrderChanged(_) => Some(UpdateKind::SourceOrderChanged),
            Self::SourceChanged(_) => Some(UpdateKind::SourceChanged),
            Self::RepopulateSources(_) => Some(UpdateKind::RepopulateSources),
            Self::VolumeChanged(_) => Some(UpdateKind::VolumeChanged),
            Self::Unhandled(_) => None,
        }
    }
}

fn from_payload<T: serde::de::DeserializeOwned>(payload: &Value) -> Result<T, RemoteError> {
    T::deserialize(payload).map_err(|e| RemoteError::Protocol(e.to_string()))
}

/// Recognized push kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateKind {
    StreamStatus,
    StreamStarting,
    StreamStopping,
    SwitchScenes,
    ScenesChanged,
    SourceOrderChanged,
    SourceChanged,
    RepopulateSources,
    VolumeChanged,
}

impl UpdateKind {
    pub const ALL: [UpdateKind; 9] = [
        Self::StreamStatus,
        Self::StreamStarting,
        Self::StreamStopping,
        Self::SwitchScenes,
        Self::ScenesChanged,
        Self::SourceOrderChanged,
        Self::SourceChanged,
        Self::RepopulateSources,
        Self::VolumeChanged,
    ];

    /// Wire discriminator.
    pub fn update_type(self) -> &'static str {
        match self {
            Self::StreamStatus => UPD_STREAM_STATUS,
            Self::StreamStarting => UPD_STREAM_STARTING,
            Self::StreamStopping => UPD_STREAM_STOPPING,
            Self::SwitchScenes => UPD_SWITCH_SCENES,
            Self::ScenesChanged => UPD_SCENES_CHANGED,
            Self::SourceOrderChanged => UPD_SOURCE_ORDER_CHANGED,
            Self::SourceChanged => UPD_SOURCE_CHANGED,
            Self::RepopulateSources => UPD_REPOPULATE_SOURCES,
            Self::VolumeChanged => UPD_VOLUME_CHANGED,
        }
    }

    /// Name of the event emitted to subscribers for this kind.
    pub fn event_name(self) -> &'static str {
        match self {
            Self::StreamStatus => "status",
            Self::StreamStarting => "start",
            Self::StreamStopping => "stop",
            Self::SwitchScenes => "sceneswitch",
            Self::ScenesChanged => "scenechange",
            Self::SourceOrderChanged => "sourceorder",
            Self::SourceChanged => "sourcechange",
            Self::RepopulateSources => "sourcerepopulate",
            Self::VolumeChanged => "volumechange",
        }
    }

    pub fn from_update_type(update_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.update_type() == update_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_kind_round_trips_its_discriminator() {
        for kind in UpdateKind::ALL {
            assert_eq!(UpdateKind::from_update_type(kind.update_type()), Some(kind));
        }
        assert_eq!(UpdateKind::from_update_type("Heartbeat"), None);
    }

    #[test]
    fn source_changed_decodes_source_with_opaque_attributes() {
        let payload = json!({
            "update-type": "SourceChanged",
            "source-name": "Webcam",
            "source": { "name": "Webcam", "render": false, "x": 10.0, "cx": 640.0 }
        });
        let Update::SourceChanged(change) = Update::decode("SourceChanged", &payload).unwrap()
        else {
            panic!("expected SourceChanged");
        };
        assert_eq!(change.source_name, "Webcam");
        assert!(!change.source.render);
        assert_eq!(change.source.attributes["cx"], json!(640.0));
    }

    #[test]
    fn wrong_payload_shape_is_protocol_error() {
        let payload = json!({ "update-type": "SourceOrderChanged", "sources": "Webcam" });
        assert!(matches!(
            Update::decode("SourceOrderChanged", &payload),
            Err(RemoteError::Protocol(_))
        ));
    }

    #[test]
    fn scene_list_prefers_switch_target() {
        let list = SceneList {
            scene_name: Some("B".into()),
            current_scene: Some("A".into()),
            scenes: None,
        };
        assert_eq!(list.selected(), Some("B"));
    }

    #[test]
    fn flat_volume_report_reads_each_channel_field() {
        let payload = json!({
            "mic-volume": 0.25, "mic-muted": true,
            "desktop-volume": 0.75, "desktop-muted": false
        });
        let Update::VolumeChanged(report) = Update::decode("VolumeChanged", &payload).unwrap()
        else {
            panic!("expected VolumeChanged");
        };
        assert_eq!(report.mic_volume, Some(0.25));
        assert_eq!(report.desktop_volume, Some(0.75));
        assert_eq!(report.mic_muted, Some(true));
        assert_eq!(report.desktop_muted, Some(false));
    }
}
