//! Property-based tests for the controller
//!
//! Each case drives a fresh controller on its own current-thread runtime.

use std::sync::Arc;

use camwatch::testing::{CollectingSink, RecordingCue, SyntheticStreamProvider};
use camwatch::{ArtifactKind, Controller};
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime builds")
}

proptest! {
    /// The next cue after set_volume plays at exactly that level
    #[test]
    fn cue_plays_at_latest_volume(first in 0.0f32..=1.0, second in 0.0f32..=1.0) {
        let cue = Arc::new(RecordingCue::default());
        let controller = Controller::builder(Arc::new(SyntheticStreamProvider::new()))
            .sink(Arc::new(CollectingSink::default()))
            .cue(cue.clone())
            .build()
            .unwrap();

        runtime().block_on(async {
            controller.set_volume(first).await.unwrap();
            controller.set_volume(second).await.unwrap();
            controller.preview_volume().await;
        });

        prop_assert_eq!(cue.volumes(), vec![second]);
        prop_assert_eq!(controller.state().volume, second);
    }

    /// Out-of-range levels are clamped, never stored as given
    #[test]
    fn volume_stays_in_unit_range(level in -10.0f32..10.0) {
        let controller = Controller::builder(Arc::new(SyntheticStreamProvider::new()))
            .sink(Arc::new(CollectingSink::default()))
            .build()
            .unwrap();

        let applied = runtime().block_on(controller.set_volume(level)).unwrap();
        prop_assert!((0.0..=1.0).contains(&applied));
        prop_assert_eq!(applied, level.clamp(0.0, 1.0));
    }

    /// Any run of record toggles leaves one clip per completed start/stop pair
    #[test]
    fn toggles_pair_up_into_clips(toggles in 1usize..8) {
        let sink = Arc::new(CollectingSink::default());
        let controller = Controller::builder(Arc::new(SyntheticStreamProvider::new()))
            .sink(sink.clone())
            .build()
            .unwrap();

        runtime().block_on(async {
            for _ in 0..toggles {
                controller.toggle_recording().await.unwrap();
            }
        });

        let artifacts = sink.artifacts();
        prop_assert_eq!(artifacts.len(), toggles / 2);
        prop_assert!(artifacts.iter().all(|a| a.kind == ArtifactKind::Video));
        prop_assert_eq!(controller.state().is_recording, toggles % 2 == 1);
    }
}
