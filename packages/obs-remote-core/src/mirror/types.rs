//! Domain types held by the state mirror.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::protocol_constants::{CHANNEL_DESKTOP, CHANNEL_MICROPHONE};

/// One source (scene item) inside a scene.
///
/// Only `name` and `render` are interpreted; position, size and anything a
/// newer server adds are carried verbatim in `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    /// Visibility flag.
    #[serde(default)]
    pub render: bool,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Source {
    pub fn new(name: impl Into<String>, render: bool) -> Self {
        Self {
            name: name.into(),
            render,
            attributes: Map::new(),
        }
    }
}

/// A scene and its ordered sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

/// Audio channels the remote plugin exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioChannel {
    Microphone,
    Desktop,
}

impl AudioChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Microphone => CHANNEL_MICROPHONE,
            Self::Desktop => CHANNEL_DESKTOP,
        }
    }
}

impl fmt::Display for AudioChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            CHANNEL_MICROPHONE | "mic" => Ok(Self::Microphone),
            CHANNEL_DESKTOP => Ok(Self::Desktop),
            other => Err(format!("unknown audio channel: {other}")),
        }
    }
}

/// Volume and mute flag of one channel; `None` until first reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChannelVolume {
    pub volume: Option<f64>,
    pub muted: Option<bool>,
}

/// Volumes of both channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct VolumeState {
    pub microphone: ChannelVolume,
    pub desktop: ChannelVolume,
}

impl VolumeState {
    pub fn channel(&self, channel: AudioChannel) -> &ChannelVolume {
        match channel {
            AudioChannel::Microphone => &self.microphone,
            AudioChannel::Desktop => &self.desktop,
        }
    }

    pub fn channel_mut(&mut self, channel: AudioChannel) -> &mut ChannelVolume {
        match channel {
            AudioChannel::Microphone => &mut self.microphone,
            AudioChannel::Desktop => &mut self.desktop,
        }
    }
}

/// Output status. `streaming` and `previewing` are never both true.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StreamStatus {
    pub streaming: bool,
    pub previewing: bool,
    pub bytes_per_sec: u64,
    pub fps: f64,
    pub strain: f64,
    pub dropped_frames: u64,
    pub total_frames: u64,
    /// Elapsed stream time as reported by the server.
    pub stream_time: u64,
}

impl StreamStatus {
    /// True while either the broadcast or the preview is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.streaming || self.previewing
    }

    /// Sets the output mode, keeping the two flags mutually exclusive.
    pub fn set_active(&mut self, active: bool, preview_only: bool) {
        self.streaming = active && !preview_only;
        self.previewing = active && preview_only;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn source_keeps_unknown_fields() {
        let source: Source = serde_json::from_value(json!({
            "name": "Mic/Aux", "render": true, "x": 1, "volume": 0.5
        }))
        .unwrap();
        assert_eq!(source.attributes.len(), 2);
        let back = serde_json::to_value(&source).unwrap();
        assert_eq!(back["x"], json!(1));
    }

    #[test]
    fn channels_parse_from_wire_names() {
        assert_eq!(
            "microphone".parse::<AudioChannel>(),
            Ok(AudioChannel::Microphone)
        );
        assert_eq!("desktop".parse::<AudioChannel>(), Ok(AudioChannel::Desktop));
        assert!("aux".parse::<AudioChannel>().is_err());
    }

    #[test]
    fn stream_flags_stay_exclusive() {
        let mut status = StreamStatus::default();
        status.set_active(true, true);
        assert!(status.previewing && !status.streaming);
        status.set_active(true, false);
        assert!(status.streaming && !status.previewing);
        status.set_active(false, false);
        assert!(!status.is_active());
    }
}
