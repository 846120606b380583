//! Local mirror of the remote application's state.
//!
//! The mirror is a sequence of immutable, versioned [`MirrorSnapshot`]s
//! published through a `tokio::sync::watch` channel. Every reconciliation
//! clones the current snapshot, mutates the clone and publishes it whole, so
//! readers never observe a partially applied push.
//!
//! The mirror is eventually consistent: it reflects the last bootstrap reply
//! or reconciled push and can lag behind the server in between.

pub mod reconcile;
pub mod types;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::error::RemoteError;
use crate::protocol::update::{SceneList, StreamStats, VolumeReport};
use crate::protocol::Update;

pub use reconcile::Reconciled;
pub use types::{AudioChannel, ChannelVolume, Scene, Source, StreamStatus, VolumeState};

/// Parts of the mirror populated by bootstrap replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapPart {
    StreamStatus,
    Scenes,
    Volumes,
}

/// Which bootstrap replies have arrived since the last invalidation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapProgress {
    pub stream_status: bool,
    pub scenes: bool,
    pub volumes: bool,
}

impl BootstrapProgress {
    fn mark(&mut self, part: BootstrapPart) {
        match part {
            BootstrapPart::StreamStatus => self.stream_status = true,
            BootstrapPart::Scenes => self.scenes = true,
            BootstrapPart::Volumes => self.volumes = true,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stream_status && self.scenes && self.volumes
    }
}

/// One immutable view of the remote state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MirrorSnapshot {
    /// Incremented on every published change.
    pub version: u64,
    pub current_scene: Option<String>,
    pub scenes: Vec<Scene>,
    pub volumes: VolumeState,
    pub stream: StreamStatus,
    pub bootstrap: BootstrapProgress,
}

impl MirrorSnapshot {
    /// True once every bootstrap reply has arrived since the last invalidation.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.bootstrap.is_complete()
    }

    /// The scene entry whose name equals the current scene name.
    pub fn current_scene_entry(&self) -> Option<&Scene> {
        let current = self.current_scene.as_deref()?;
        self.scenes.iter().find(|s| s.name == current)
    }

    /// Sources of the current scene; empty when the current scene is unknown.
    pub fn sources(&self) -> &[Source] {
        self.current_scene_entry()
            .map(|scene| scene.sources.as_slice())
            .unwrap_or_default()
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Position of the named source within the active source list.
    pub fn find_source_index(&self, name: &str) -> Option<usize> {
        self.sources().iter().position(|s| s.name == name)
    }

    pub(crate) fn active_sources_mut(&mut self) -> Option<&mut Vec<Source>> {
        let current = self.current_scene.as_deref()?;
        self.scenes
            .iter_mut()
            .find(|s| s.name == current)
            .map(|scene| &mut scene.sources)
    }
}

/// Publisher of mirror snapshots.
pub struct Mirror {
    tx: watch::Sender<Arc<MirrorSnapshot>>,
}

impl Mirror {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Arc::new(MirrorSnapshot::default()));
        Self { tx }
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<MirrorSnapshot> {
        Arc::clone(&self.tx.borrow())
    }

    /// Returns a receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<MirrorSnapshot>> {
        self.tx.subscribe()
    }

    /// Waits until every bootstrap reply has been applied.
    pub async fn wait_until_synced(&self) -> Arc<MirrorSnapshot> {
        let mut rx = self.tx.subscribe();
        let synced = rx
            .wait_for(|snapshot| snapshot.is_valid())
            .await
            .map(|snapshot| Arc::clone(&snapshot));
        // The sender lives as long as `self`, so the channel cannot close here.
        synced.unwrap_or_else(|_| self.snapshot())
    }

    /// Marks the mirror invalid until a fresh bootstrap completes.
    ///
    /// The last known values stay readable; only the validity flag drops.
    pub fn invalidate(&self) {
        self.tx.send_modify(|current| {
            let mut next = MirrorSnapshot::clone(current);
            next.bootstrap = BootstrapProgress::default();
            next.version += 1;
            *current = Arc::new(next);
        });
        log::debug!("[Mirror] Invalidated; awaiting bootstrap");
    }

    /// Applies one decoded push.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::StateDesync`] when the push references sources
    /// the mirror does not hold. The published snapshot is left untouched.
    pub fn apply(&self, update: &Update) -> Result<Reconciled, RemoteError> {
        self.reconcile(|next| reconcile::apply_update(next, update))
    }

    /// Applies a `GetStreamingStatus` reply.
    pub fn apply_stream_bootstrap(&self, stats: &StreamStats) {
        self.bootstrap(BootstrapPart::StreamStatus, |next| {
            reconcile::apply_stream_stats(next, stats);
        });
    }

    /// Applies a `GetSceneList` reply.
    pub fn apply_scene_bootstrap(&self, list: &SceneList) {
        self.bootstrap(BootstrapPart::Scenes, |next| {
            reconcile::apply_scene_list(next, list);
        });
    }

    /// Applies a `GetVolumes` reply.
    pub fn apply_volume_bootstrap(&self, report: &VolumeReport) {
        self.bootstrap(BootstrapPart::Volumes, |next| {
            reconcile::apply_volumes(next, report);
        });
    }

    fn bootstrap(&self, part: BootstrapPart, apply: impl FnOnce(&mut MirrorSnapshot)) {
        let _ = self.reconcile(|next| {
            apply(next);
            next.bootstrap.mark(part);
            Ok(Reconciled::Applied)
        });
        log::debug!("[Mirror] Bootstrap part applied: {:?}", part);
    }

    /// Runs `step` against a clone of the current snapshot and publishes the
    /// clone only if the step reports [`Reconciled::Applied`].
    fn reconcile(
        &self,
        step: impl FnOnce(&mut MirrorSnapshot) -> Result<Reconciled, RemoteError>,
    ) -> Result<Reconciled, RemoteError> {
        let mut outcome = Ok(Reconciled::Unchanged);
        self.tx.send_if_modified(|current| {
            let mut next = MirrorSnapshot::clone(current);
            outcome = step(&mut next);
            if matches!(outcome, Ok(Reconciled::Applied)) {
                next.version = current.version + 1;
                *current = Arc::new(next);
                true
            } else {
                false
            }
        });
        outcome
    }
}

impl Default for Mirror {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::update::{SourceOrder, StreamTransition};
    use std::time::Duration;

    fn scene_list() -> SceneList {
        SceneList {
            current_scene: Some("Live".into()),
            scenes: Some(vec![Scene {
                name: "Live".into(),
                sources: vec![Source::new("A", true), Source::new("B", true)],
            }]),
            ..Default::default()
        }
    }

    #[test]
    fn reconciliation_publishes_new_version() {
        let mirror = Mirror::new();
        let before = mirror.snapshot();
        mirror
            .apply(&Update::StreamStarting(StreamTransition::default()))
            .unwrap();
        let after = mirror.snapshot();

        assert_eq!(after.version, before.version + 1);
        assert!(after.stream.streaming);
        // Old readers keep their consistent view.
        assert!(!before.stream.streaming);
    }

    #[test]
    fn failed_reconciliation_leaves_snapshot_untouched() {
        let mirror = Mirror::new();
        mirror.apply_scene_bootstrap(&scene_list());
        let before = mirror.snapshot();

        let result = mirror.apply(&Update::SourceOrderChanged(SourceOrder {
            sources: vec!["B".into(), "Missing".into()],
        }));

        assert!(matches!(result, Err(RemoteError::StateDesync(_))));
        assert_eq!(mirror.snapshot(), before);
    }

    #[test]
    fn unhandled_update_does_not_bump_version() {
        let mirror = Mirror::new();
        let before = mirror.snapshot().version;
        assert_eq!(
            mirror.apply(&Update::Unhandled("Heartbeat".into())).unwrap(),
            Reconciled::Unchanged
        );
        assert_eq!(mirror.snapshot().version, before);
    }

    #[test]
    fn valid_only_after_all_bootstrap_parts() {
        let mirror = Mirror::new();
        assert!(!mirror.snapshot().is_valid());
        mirror.apply_scene_bootstrap(&scene_list());
        mirror.apply_volume_bootstrap(&VolumeReport::default());
        assert!(!mirror.snapshot().is_valid());
        mirror.apply_stream_bootstrap(&StreamStats::default());
        assert!(mirror.snapshot().is_valid());

        mirror.invalidate();
        let snap = mirror.snapshot();
        assert!(!snap.is_valid());
        assert_eq!(snap.sources().len(), 2, "last known values stay readable");
    }

    #[tokio::test]
    async fn wait_until_synced_resolves_after_bootstrap() {
        let mirror = Arc::new(Mirror::new());
        let waiter = {
            let mirror = Arc::clone(&mirror);
            tokio::spawn(async move { mirror.wait_until_synced().await })
        };

        mirror.apply_scene_bootstrap(&scene_list());
        mirror.apply_volume_bootstrap(&VolumeReport::default());
        mirror.apply_stream_bootstrap(&StreamStats::default());

        let snapshot = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter timed out")
            .expect("waiter panicked");
        assert_eq!(snapshot.current_scene.as_deref(), Some("Live"));
    }
}
