//! Reconciliation of pushed deltas into a mirror snapshot.
//!
//! Every function here works on an owned, not-yet-published snapshot. A
//! failed step returns an error and the caller discards the snapshot, so
//! the published state never reflects a half-applied push.

use crate::error::RemoteError;
use crate::protocol::update::{
    SceneList, SourceList, SourceOrder, SourceReplacement, StreamStats, StreamTransition,
    VolumeReport,
};
use crate::protocol::Update;

use super::types::{AudioChannel, Source};
use super::MirrorSnapshot;

/// What a reconciliation step did to the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The snapshot changed and must be published.
    Applied,
    /// Nothing matched; the snapshot is unchanged.
    Unchanged,
    /// The push announced a scene-list change without carrying the list.
    SceneListRequested,
}

/// Applies one decoded push to `snapshot`.
pub(crate) fn apply_update(
    snapshot: &mut MirrorSnapshot,
    update: &Update,
) -> Result<Reconciled, RemoteError> {
    match update {
        Update::StreamStatus(stats) => Ok(apply_stream_stats(snapshot, stats)),
        Update::StreamStarting(transition) => Ok(apply_stream_start(snapshot, transition)),
        Update::StreamStopping(_) => Ok(apply_stream_stop(snapshot)),
        Update::SwitchScenes(list) => Ok(apply_scene_switch(snapshot, list)),
        Update::ScenesChanged(list) => Ok(apply_scenes_changed(snapshot, list)),
        Update::SourceOrderChanged(order) => apply_source_order(snapshot, order),
        Update::SourceChanged(change) => Ok(apply_source_change(snapshot, change)),
        Update::RepopulateSources(list) => apply_repopulate(snapshot, list),
        Update::VolumeChanged(report) => Ok(apply_volumes(snapshot, report)),
        Update::Unhandled(_) => Ok(Reconciled::Unchanged),
    }
}

pub(crate) fn apply_stream_stats(snapshot: &mut MirrorSnapshot, stats: &StreamStats) -> Reconciled {
    let stream = &mut snapshot.stream;
    if let Some(active) = stats.streaming {
        stream.set_active(active, stats.preview_only.unwrap_or(false));
    }
    if let Some(v) = stats.bytes_per_sec {
        stream.bytes_per_sec = v;
    }
    if let Some(v) = stats.fps {
        stream.fps = v;
    }
    if let Some(v) = stats.strain {
        stream.strain = v;
    }
    if let Some(v) = stats.num_dropped_frames {
        stream.dropped_frames = v;
    }
    if let Some(v) = stats.num_total_frames {
        stream.total_frames = v;
    }
    if let Some(v) = stats.total_stream_time {
        stream.stream_time = v;
    }
    Reconciled::Applied
}

fn apply_stream_start(snapshot: &mut MirrorSnapshot, transition: &StreamTransition) -> Reconciled {
    snapshot.stream.set_active(true, transition.preview_only);
    Reconciled::Applied
}

fn apply_stream_stop(snapshot: &mut MirrorSnapshot) -> Reconciled {
    snapshot.stream.set_active(false, false);
    Reconciled::Applied
}

fn apply_scene_switch(snapshot: &mut MirrorSnapshot, list: &SceneList) -> Reconciled {
    let mut changed = false;
    if let Some(scenes) = &list.scenes {
        snapshot.scenes = scenes.clone();
        changed = true;
    }
    if let Some(name) = list.selected() {
        snapshot.current_scene = Some(name.to_string());
        changed = true;
    }
    if changed {
        Reconciled::Applied
    } else {
        Reconciled::Unchanged
    }
}

fn apply_scenes_changed(snapshot: &mut MirrorSnapshot, list: &SceneList) -> Reconciled {
    if list.scenes.is_none() {
        return Reconciled::SceneListRequested;
    }
    apply_scene_switch(snapshot, list)
}

/// Replaces the scene list and current scene from a `GetSceneList` reply.
pub(crate) fn apply_scene_list(snapshot: &mut MirrorSnapshot, list: &SceneList) -> Reconciled {
    snapshot.scenes = list.scenes.clone().unwrap_or_default();
    snapshot.current_scene = list.selected().map(str::to_string);
    Reconciled::Applied
}

fn apply_source_order(
    snapshot: &mut MirrorSnapshot,
    order: &SourceOrder,
) -> Result<Reconciled, RemoteError> {
    match snapshot.active_sources_mut() {
        Some(sources) => {
            *sources = reorder_by_name(sources, &order.sources)?;
            Ok(Reconciled::Applied)
        }
        None if order.sources.is_empty() => Ok(Reconciled::Unchanged),
        None => Err(RemoteError::StateDesync(format!(
            "source order names {} sources but no active scene is held",
            order.sources.len()
        ))),
    }
}

/// Rearranges `sources` to follow `order`, matching by name.
///
/// Each local source is used exactly once, so the result holds the same
/// multiset of sources with every non-name attribute untouched.
pub(crate) fn reorder_by_name(
    sources: &[Source],
    order: &[String],
) -> Result<Vec<Source>, RemoteError> {
    if order.len() != sources.len() {
        return Err(RemoteError::StateDesync(format!(
            "source order has {} names, {} sources held locally",
            order.len(),
            sources.len()
        )));
    }

    let mut remaining: Vec<Option<&Source>> = sources.iter().map(Some).collect();
    let mut reordered = Vec::with_capacity(sources.len());
    for name in order {
        let slot = remaining
            .iter_mut()
            .find(|slot| slot.is_some_and(|s| s.name == *name))
            .and_then(Option::take)
            .ok_or_else(|| {
                RemoteError::StateDesync(format!("source '{name}' is not held locally"))
            })?;
        reordered.push(slot.clone());
    }
    Ok(reordered)
}

fn apply_source_change(snapshot: &mut MirrorSnapshot, change: &SourceReplacement) -> Reconciled {
    let Some(sources) = snapshot.active_sources_mut() else {
        return Reconciled::Unchanged;
    };
    match sources.iter_mut().find(|s| s.name == change.source_name) {
        Some(slot) => {
            *slot = change.source.clone();
            Reconciled::Applied
        }
        None => Reconciled::Unchanged,
    }
}

fn apply_repopulate(
    snapshot: &mut MirrorSnapshot,
    list: &SourceList,
) -> Result<Reconciled, RemoteError> {
    let Some(sources) = snapshot.active_sources_mut() else {
        return Err(RemoteError::StateDesync(
            "sources repopulated but no active scene is held".into(),
        ));
    };
    *sources = list.sources.clone();
    Ok(Reconciled::Applied)
}

/// Overwrites whichever volume fields the report carries.
pub(crate) fn apply_volumes(snapshot: &mut MirrorSnapshot, report: &VolumeReport) -> Reconciled {
    let volumes = &mut snapshot.volumes;

    if let Some(channel) = report.channel.as_deref() {
        match channel.parse::<AudioChannel>() {
            Ok(channel) => {
                let slot = volumes.channel_mut(channel);
                if report.volume.is_some() {
                    slot.volume = report.volume;
                }
                if report.muted.is_some() {
                    slot.muted = report.muted;
                }
            }
            Err(e) => log::debug!("[Mirror] Ignoring volume report: {}", e),
        }
    }

    if report.mic_volume.is_some() {
        volumes.microphone.volume = report.mic_volume;
    }
    if report.mic_muted.is_some() {
        volumes.microphone.muted = report.mic_muted;
    }
    if report.desktop_volume.is_some() {
        volumes.desktop.volume = report.desktop_volume;
    }
    if report.desktop_muted.is_some() {
        volumes.desktop.muted = report.desktop_muted;
    }
    Reconciled::Applied
}
