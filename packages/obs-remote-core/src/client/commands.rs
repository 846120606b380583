//! Guarded user commands.
//!
//! Each command reads the latest snapshot, skips requests the mirror says
//! would be redundant, and otherwise sends one request without a callback.
//! Guards only save traffic: the snapshot can be stale and the server treats
//! duplicates safely. Every command returns whether a request was sent.

use super::RemoteClient;
use crate::mirror::{AudioChannel, Source};
use crate::protocol::requests;
use crate::utils::same_name_set;

impl RemoteClient {
    // ─────────────────────────────────────────────────────────────────────────
    // Audio
    // ─────────────────────────────────────────────────────────────────────────

    /// Mutes `channel` unless it is known to be muted already.
    pub fn mute(&self, channel: AudioChannel) -> bool {
        if self.snapshot().volumes.channel(channel).muted == Some(true) {
            log::debug!("[Commands] {} already muted", channel);
            return false;
        }
        self.dispatch(requests::toggle_mute(channel))
    }

    /// Unmutes `channel` unless it is known to be unmuted already.
    pub fn unmute(&self, channel: AudioChannel) -> bool {
        if self.snapshot().volumes.channel(channel).muted == Some(false) {
            log::debug!("[Commands] {} already unmuted", channel);
            return false;
        }
        self.dispatch(requests::toggle_mute(channel))
    }

    pub fn toggle_mute(&self, channel: AudioChannel) -> bool {
        self.dispatch(requests::toggle_mute(channel))
    }

    /// Sets the volume of `channel`, clamped to `0.0..=1.0`.
    ///
    /// `is_final` distinguishes the committed value from live drag updates.
    pub fn set_volume(&self, channel: AudioChannel, volume: f64, is_final: bool) -> bool {
        if !volume.is_finite() {
            log::warn!("[Commands] Rejecting non-finite volume {}", volume);
            return false;
        }
        self.dispatch(requests::set_volume(channel, volume.clamp(0.0, 1.0), is_final))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Output
    // ─────────────────────────────────────────────────────────────────────────

    /// Starts the broadcast. Rejected while streaming or previewing.
    pub fn start_stream(&self) -> bool {
        let snapshot = self.snapshot();
        let stream = &snapshot.stream;
        if stream.is_active() {
            log::debug!(
                "[Commands] Not starting stream (streaming={}, previewing={})",
                stream.streaming,
                stream.previewing
            );
            return false;
        }
        self.dispatch(requests::start_stop_streaming())
    }

    /// Stops the broadcast. Requires streaming.
    pub fn stop_stream(&self) -> bool {
        if !self.snapshot().stream.streaming {
            return false;
        }
        self.dispatch(requests::start_stop_streaming())
    }

    /// Stops the broadcast if streaming, otherwise starts it.
    ///
    /// Goes through the same guards as start and stop, so it does nothing
    /// while previewing.
    pub fn toggle_stream(&self) -> bool {
        if self.snapshot().stream.streaming {
            self.stop_stream()
        } else {
            self.start_stream()
        }
    }

    /// Starts preview-only mode. Rejected while streaming or previewing.
    pub fn start_preview(&self) -> bool {
        let snapshot = self.snapshot();
        let stream = &snapshot.stream;
        if stream.is_active() {
            log::debug!(
                "[Commands] Not starting preview (streaming={}, previewing={})",
                stream.streaming,
                stream.previewing
            );
            return false;
        }
        self.dispatch(requests::start_stop_preview())
    }

    /// Stops preview-only mode. Requires previewing.
    pub fn stop_preview(&self) -> bool {
        if !self.snapshot().stream.previewing {
            return false;
        }
        self.dispatch(requests::start_stop_preview())
    }

    /// Stops preview if previewing, otherwise starts it. Does nothing while
    /// streaming.
    pub fn toggle_preview(&self) -> bool {
        if self.snapshot().stream.previewing {
            self.stop_preview()
        } else {
            self.start_preview()
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scenes
    // ─────────────────────────────────────────────────────────────────────────

    /// Switches to the named scene unless it is already current.
    pub fn set_scene_by_name(&self, name: &str) -> bool {
        if self.snapshot().current_scene.as_deref() == Some(name) {
            return false;
        }
        self.dispatch(requests::set_current_scene(name))
    }

    /// Switches to the scene at `index` in the scene list.
    pub fn set_scene(&self, index: usize) -> bool {
        let snapshot = self.snapshot();
        let Some(scene) = snapshot.scenes.get(index) else {
            log::debug!(
                "[Commands] Scene index {} out of range ({} scenes)",
                index,
                snapshot.scene_count()
            );
            return false;
        };
        if snapshot.current_scene.as_deref() == Some(scene.name.as_str()) {
            return false;
        }
        self.dispatch(requests::set_current_scene(&scene.name))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sources
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_source_visible(&self, index: usize) -> bool {
        self.set_source_render(index, true)
    }

    pub fn set_source_invisible(&self, index: usize) -> bool {
        self.set_source_render(index, false)
    }

    pub fn set_source_visible_by_name(&self, name: &str) -> bool {
        match self.snapshot().find_source_index(name) {
            Some(index) => self.set_source_render(index, true),
            None => false,
        }
    }

    pub fn set_source_invisible_by_name(&self, name: &str) -> bool {
        match self.snapshot().find_source_index(name) {
            Some(index) => self.set_source_render(index, false),
            None => false,
        }
    }

    fn set_source_render(&self, index: usize, render: bool) -> bool {
        let snapshot = self.snapshot();
        let Some(source) = snapshot.sources().get(index) else {
            return false;
        };
        if source.render == render {
            return false;
        }
        self.dispatch(requests::set_source_render(&source.name, render))
    }

    /// Reorders the active sources by an index permutation.
    ///
    /// `order[i]` is the current index of the source that should end up at
    /// position `i`.
    pub fn set_source_order(&self, order: &[usize]) -> bool {
        let snapshot = self.snapshot();
        let sources = snapshot.sources();
        let names: Option<Vec<&str>> = order
            .iter()
            .map(|&i| sources.get(i).map(|s| s.name.as_str()))
            .collect();
        match names {
            Some(names) => self.send_source_order(sources, &names),
            None => false,
        }
    }

    /// Reorders the active sources by an explicit name sequence.
    pub fn set_source_order_by_name<S: AsRef<str>>(&self, names: &[S]) -> bool {
        let snapshot = self.snapshot();
        self.send_source_order(snapshot.sources(), names)
    }

    /// Moves the source at `old_index` to `new_index`, shifting the rest.
    pub fn shift_source_order(&self, old_index: usize, new_index: usize) -> bool {
        let snapshot = self.snapshot();
        let sources = snapshot.sources();
        if old_index == new_index || old_index >= sources.len() || new_index >= sources.len() {
            return false;
        }
        let mut names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        let moved = names.remove(old_index);
        names.insert(new_index, moved);
        self.send_source_order(sources, &names)
    }

    fn send_source_order<S: AsRef<str>>(&self, current: &[Source], names: &[S]) -> bool {
        let current_names: Vec<&str> = current.iter().map(|s| s.name.as_str()).collect();
        if names.len() != current_names.len() || !same_name_set(names, &current_names) {
            log::debug!("[Commands] Source order does not match the current sources");
            return false;
        }
        if names
            .iter()
            .zip(&current_names)
            .all(|(a, b)| a.as_ref() == *b)
        {
            return false;
        }
        self.dispatch(requests::set_source_order(names))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::protocol::update::{StreamTransition, VolumeReport};
    use crate::protocol::Update;

    #[test]
    fn set_scene_by_name_skips_current_scene() {
        let (client, mut rx) = attached_client();
        seed(&client, false);

        assert!(!client.set_scene_by_name("Live"));
        assert!(drain(&mut rx).is_empty());

        assert!(client.set_scene_by_name("Break"));
        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["request-type"], "SetCurrentScene");
        assert_eq!(frames[0]["scene-name"], "Break");
    }

    #[test]
    fn set_scene_by_index_is_bounds_checked() {
        let (client, mut rx) = attached_client();
        seed(&client, false);

        assert!(!client.set_scene(2));
        assert!(!client.set_scene(0), "index 0 is the current scene");
        assert!(client.set_scene(1));
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn preview_rejected_while_streaming() {
        let (client, mut rx) = attached_client();
        seed(&client, false);

        assert!(client.start_stream());
        client
            .mirror()
            .apply(&Update::StreamStarting(StreamTransition::default()))
            .unwrap();
        assert!(!client.start_preview());
        assert!(!client.start_stream());
        assert_eq!(drain(&mut rx).len(), 1);

        client
            .mirror()
            .apply(&Update::StreamStopping(StreamTransition::default()))
            .unwrap();
        assert!(client.start_preview());
        let frames = drain(&mut rx);
        assert_eq!(frames[0]["request-type"], "StartStopStreaming");
        assert_eq!(frames[0]["preview-only"], true);
    }

    #[test]
    fn stop_requires_matching_mode() {
        let (client, mut rx) = attached_client();
        seed(&client, true);

        assert!(!client.stop_preview());
        assert!(client.stop_stream());
        assert!(client.toggle_stream());
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[test]
    fn toggles_never_start_a_second_output() {
        let (client, mut rx) = attached_client();
        seed(&client, false);
        client
            .mirror()
            .apply(&Update::StreamStarting(StreamTransition { preview_only: true }))
            .unwrap();

        assert!(!client.toggle_stream());
        assert!(drain(&mut rx).is_empty());

        assert!(client.toggle_preview());
        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["preview-only"], true);
    }

    #[test]
    fn mute_guards_on_known_state() {
        let (client, mut rx) = attached_client();
        seed(&client, false);

        // Desktop is seeded muted, microphone unmuted.
        assert!(!client.mute(AudioChannel::Desktop));
        assert!(!client.unmute(AudioChannel::Microphone));
        assert!(client.mute(AudioChannel::Microphone));
        assert!(client.unmute(AudioChannel::Desktop));

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["request-type"], "ToggleMute");
        assert_eq!(frames[0]["channel"], "microphone");
        assert_eq!(frames[1]["channel"], "desktop");
    }

    #[test]
    fn unknown_mute_state_always_sends() {
        let (client, mut rx) = attached_client();
        client.mirror().apply_volume_bootstrap(&VolumeReport::default());
        assert!(client.mute(AudioChannel::Microphone));
        assert!(client.unmute(AudioChannel::Microphone));
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[test]
    fn volume_is_clamped_and_finite() {
        let (client, mut rx) = attached_client();
        assert!(!client.set_volume(AudioChannel::Microphone, f64::NAN, true));
        assert!(client.set_volume(AudioChannel::Microphone, 1.7, false));

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["volume"], 1.0);
        assert_eq!(frames[0]["final"], false);
    }

    #[test]
    fn visibility_skips_target_state() {
        let (client, mut rx) = attached_client();
        seed(&client, false);

        assert!(!client.set_source_visible(0));
        assert!(!client.set_source_invisible_by_name("Overlay"));
        assert!(!client.set_source_visible_by_name("Nope"));
        assert!(!client.set_source_visible(9));
        assert!(client.set_source_visible_by_name("Overlay"));

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["source"], "Overlay");
        assert_eq!(frames[0]["render"], true);
    }

    #[test]
    fn source_order_by_index_permutation() {
        let (client, mut rx) = attached_client();
        seed(&client, false);

        assert!(!client.set_source_order(&[0, 1]), "length mismatch");
        assert!(!client.set_source_order(&[0, 0, 1]), "not a permutation");
        assert!(!client.set_source_order(&[0, 1, 5]), "out of range");
        assert!(!client.set_source_order(&[0, 1, 2]), "identity");
        assert!(client.set_source_order(&[2, 0, 1]));

        let frames = drain(&mut rx);
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0]["scene-names"],
            serde_json::json!(["Mic", "Camera", "Overlay"])
        );
    }

    #[test]
    fn source_order_by_name_validates_name_set() {
        let (client, mut rx) = attached_client();
        seed(&client, false);

        assert!(!client.set_source_order_by_name(&["Camera", "Overlay", "Other"]));
        assert!(!client.set_source_order_by_name(&["Camera", "Overlay"]));
        assert!(client.set_source_order_by_name(&["Overlay", "Mic", "Camera"]));
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn shift_moves_one_source() {
        let (client, mut rx) = attached_client();
        seed(&client, false);

        assert!(!client.shift_source_order(1, 1));
        assert!(!client.shift_source_order(0, 3));
        assert!(client.shift_source_order(0, 2));

        let frames = drain(&mut rx);
        assert_eq!(
            frames[0]["scene-names"],
            serde_json::json!(["Overlay", "Mic", "Camera"])
        );
    }

    #[test]
    fn commands_are_dropped_when_not_connected() {
        let client = RemoteClient::new(&crate::state::Config::default());
        assert!(!client.toggle_mute(AudioChannel::Desktop));
        assert!(!client.start_stream());
    }
}
