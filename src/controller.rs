//! Capture & recording controller
//!
//! Owns the camera session, the recording state machine and the volume and
//! auto-record preferences. Intents are processed one at a time behind a
//! single async lock; start/stop intents that arrive while another recording
//! transition is still running are ignored rather than queued.
//!
//! States: camera off, camera on and idle, camera on and recording.
//!
//! ```rust,ignore
//! let controller = Controller::builder(Arc::new(NativeStreamProvider::default()))
//!     .cue(Arc::new(CpalCue::spawn(ToneSpec::default())?))
//!     .build()?;
//!
//! controller.enable_camera().await?;
//! controller.toggle_recording().await?; // start
//! controller.toggle_recording().await?; // stop, clip handed to the sink
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::artifacts::{ArtifactKind, ArtifactReceipt, ArtifactSink, CapturedArtifact, DownloadDirSink};
use crate::audio::{AudioCue, SilentCue, VolumeSetting};
use crate::camera::CameraSession;
use crate::check_invariant;
use crate::config::CamwatchConfig;
use crate::errors::Result;
use crate::invariants::{SINGLE_RECORDING, TIMER_IFF_RECORDING};
use crate::media::MediaStreamProvider;
use crate::notify::{LogNotifier, Notification, Notifier};
use crate::presence::PresenceSignal;
use crate::recording::{AutoStopTimer, RecordingSession, RecordingState, TimerExit};
use crate::snapshot::SnapshotEncoder;
use crate::types::{ControllerState, StartTrigger, StopReason};

/// Outcome of a record toggle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum RecordingToggle {
    Started,
    /// Carries the receipt of the saved clip, if the recorder produced data
    Stopped { saved: Option<ArtifactReceipt> },
    /// Another start/stop was still in flight
    Ignored,
}

struct Inner {
    camera: CameraSession,
    recording: Option<RecordingSession>,
    auto_record: bool,
    volume: VolumeSetting,
}

struct Shared {
    inner: Mutex<Inner>,
    transitions: AtomicUsize,
    provider: Arc<dyn MediaStreamProvider>,
    cue: Arc<dyn AudioCue>,
    sink: Arc<dyn ArtifactSink>,
    notifier: Arc<dyn Notifier>,
    config: CamwatchConfig,
    state_tx: watch::Sender<ControllerState>,
}

/// Marks a recording transition as in flight for as long as it lives
struct TransitionGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> TransitionGuard<'a> {
    /// Succeeds only when no other transition is in flight
    fn try_acquire(counter: &'a AtomicUsize) -> Option<Self> {
        counter
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { counter })
    }

    /// For transitions that must run regardless (auto-stop, camera teardown)
    fn force(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self { counter }
    }
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Builder for [`Controller`]
pub struct ControllerBuilder {
    provider: Arc<dyn MediaStreamProvider>,
    cue: Option<Arc<dyn AudioCue>>,
    sink: Option<Arc<dyn ArtifactSink>>,
    notifier: Option<Arc<dyn Notifier>>,
    config: CamwatchConfig,
}

impl ControllerBuilder {
    pub fn cue(mut self, cue: Arc<dyn AudioCue>) -> Self {
        self.cue = Some(cue);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn config(mut self, config: CamwatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Controller> {
        self.config.validate()?;

        let camera = CameraSession::new(self.config.camera.start_mirrored);
        let volume = VolumeSetting::new(self.config.audio.default_volume)?;
        let inner = Inner {
            camera,
            recording: None,
            auto_record: false,
            volume,
        };
        let (state_tx, _) = watch::channel(snapshot_state(&inner));

        let sink = self.sink.unwrap_or_else(|| {
            Arc::new(DownloadDirSink::new(self.config.storage.download_path()))
        });

        Ok(Controller {
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                transitions: AtomicUsize::new(0),
                provider: self.provider,
                cue: self.cue.unwrap_or_else(|| Arc::new(SilentCue)),
                sink,
                notifier: self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
                config: self.config,
                state_tx,
            }),
        })
    }
}

fn snapshot_state(inner: &Inner) -> ControllerState {
    ControllerState {
        camera_on: inner.camera.is_enabled(),
        mirrored: inner.camera.is_mirrored(),
        is_recording: inner.recording.is_some(),
        auto_record_enabled: inner.auto_record,
        volume: inner.volume.level(),
        recording_started_at: inner.recording.as_ref().map(|s| s.started_at()),
        auto_stop_armed: inner.recording.as_ref().is_some_and(|s| s.timer_armed()),
    }
}

/// Cheap to clone; clones drive the same controller.
#[derive(Clone)]
pub struct Controller {
    shared: Arc<Shared>,
}

impl Controller {
    pub fn builder(provider: Arc<dyn MediaStreamProvider>) -> ControllerBuilder {
        ControllerBuilder {
            provider,
            cue: None,
            sink: None,
            notifier: None,
            config: CamwatchConfig::default(),
        }
    }

    pub fn config(&self) -> &CamwatchConfig {
        &self.shared.config
    }

    /// Latest observable state
    pub fn state(&self) -> ControllerState {
        self.shared.state_tx.borrow().clone()
    }

    pub fn recording_state(&self) -> RecordingState {
        if self.shared.state_tx.borrow().is_recording {
            RecordingState::Recording
        } else {
            RecordingState::Idle
        }
    }

    /// Receiver that sees every state change
    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.shared.state_tx.subscribe()
    }

    pub async fn enable_camera(&self) -> Result<()> {
        let mut inner = self.shared.inner.lock().await;
        let result = inner.camera.enable(self.shared.provider.as_ref()).await;
        self.publish(&inner);
        self.surface(result.map(|_| ()))
    }

    /// Turn the camera off, finalizing any active recording before the
    /// stream is released. The stream is released even when finalizing fails.
    pub async fn disable_camera(&self) -> Result<Option<ArtifactReceipt>> {
        let _transition = TransitionGuard::force(&self.shared.transitions);
        let mut inner = self.shared.inner.lock().await;

        let finalized = self
            .finish_locked(&mut inner, StopReason::CameraDisabled, TimerExit::Cancel)
            .await;
        inner.camera.disable().await;
        self.publish(&inner);
        self.surface(finalized)
    }

    pub async fn toggle_mirror(&self) -> bool {
        let mut inner = self.shared.inner.lock().await;
        let mirrored = inner.camera.toggle_mirror();
        self.publish(&inner);
        mirrored
    }

    /// Capture one still. Enables the camera first when it is off.
    pub async fn take_snapshot(&self) -> Result<ArtifactReceipt> {
        let mut inner = self.shared.inner.lock().await;
        let result = self.snapshot_locked(&mut inner).await;
        self.publish(&inner);
        self.surface(result)
    }

    /// Start a recording when idle, stop it when recording
    pub async fn toggle_recording(&self) -> Result<RecordingToggle> {
        let Some(_transition) = TransitionGuard::try_acquire(&self.shared.transitions) else {
            log::debug!("Record toggle ignored, a transition is in flight");
            return Ok(RecordingToggle::Ignored);
        };
        let mut inner = self.shared.inner.lock().await;

        let result = if inner.recording.is_some() {
            self.finish_locked(&mut inner, StopReason::UserRequest, TimerExit::Cancel)
                .await
                .map(|saved| RecordingToggle::Stopped { saved })
        } else {
            self.start_locked(&mut inner, StartTrigger::User, true)
                .await
                .map(|_| RecordingToggle::Started)
        };
        self.publish(&inner);
        self.surface(result)
    }

    /// Start a recording with a cue. Returns `false` when one is already
    /// running or another transition is in flight.
    pub async fn start_recording(&self) -> Result<bool> {
        let Some(_transition) = TransitionGuard::try_acquire(&self.shared.transitions) else {
            log::debug!("Start ignored, a transition is in flight");
            return Ok(false);
        };
        let mut inner = self.shared.inner.lock().await;
        let result = self.start_locked(&mut inner, StartTrigger::User, true).await;
        self.publish(&inner);
        self.surface(result)
    }

    /// Stop the active recording, if any
    pub async fn stop_recording(&self) -> Result<Option<ArtifactReceipt>> {
        let Some(_transition) = TransitionGuard::try_acquire(&self.shared.transitions) else {
            log::debug!("Stop ignored, a transition is in flight");
            return Ok(None);
        };
        let mut inner = self.shared.inner.lock().await;
        let result = self
            .finish_locked(&mut inner, StopReason::UserRequest, TimerExit::Cancel)
            .await;
        self.publish(&inner);
        self.surface(result)
    }

    /// Flip the auto-record preference and announce the new value
    pub async fn toggle_auto_record(&self) -> bool {
        let mut inner = self.shared.inner.lock().await;
        inner.auto_record = !inner.auto_record;
        let enabled = inner.auto_record;
        self.shared
            .notifier
            .notify(Notification::AutoRecord { enabled });
        self.publish(&inner);
        log::info!("Auto-record {}", if enabled { "enabled" } else { "disabled" });
        enabled
    }

    /// Change the cue volume. Makes no sound; see [`Controller::preview_volume`].
    pub async fn set_volume(&self, level: f32) -> Result<f32> {
        let mut inner = self.shared.inner.lock().await;
        let level = inner.volume.set(level)?;
        self.publish(&inner);
        Ok(level)
    }

    /// Play a cue at the current volume so the user hears the level
    pub async fn preview_volume(&self) {
        let inner = self.shared.inner.lock().await;
        self.shared.cue.emit(inner.volume.level());
    }

    /// Release the camera and anything recording on it
    pub async fn shutdown(&self) -> Result<()> {
        self.disable_camera().await.map(|_| ())
    }

    async fn snapshot_locked(&self, inner: &mut Inner) -> Result<ArtifactReceipt> {
        self.ensure_camera(inner).await?;

        let frame = inner.camera.grab_frame().await?;
        let flip = self.shared.config.camera.mirror_snapshots && inner.camera.is_mirrored();
        let artifact = SnapshotEncoder::new().flipped(flip).capture(&frame)?;
        let receipt = artifact.receipt();

        self.shared.cue.emit(inner.volume.level());
        self.shared.sink.deliver(artifact).await?;
        log::info!("Snapshot saved as {}", receipt.filename);
        Ok(receipt)
    }

    async fn start_locked(&self, inner: &mut Inner, trigger: StartTrigger, cue: bool) -> Result<bool> {
        if inner.recording.is_some() {
            log::debug!("Start ignored, already recording");
            return Ok(false);
        }

        self.ensure_camera(inner).await?;
        check_invariant!(
            inner.recording.is_none() && !inner.camera.is_recording(),
            SINGLE_RECORDING,
            "Controller::start"
        );
        inner.camera.start_clip().await?;

        if cue {
            self.shared.cue.emit(inner.volume.level());
        }

        let id = Uuid::new_v4();
        let timer = self.arm_auto_stop(id);
        inner.recording = Some(RecordingSession::new(id, trigger, timer));

        log::info!(
            "Recording {} started ({:?}), auto-stop in {}ms",
            id,
            trigger,
            self.shared.config.recording.max_clip_duration_ms
        );
        Ok(true)
    }

    /// Shared exit path of every recording: dispose of the timer, flush and
    /// finalize the clip, hand it off, announce it.
    async fn finish_locked(
        &self,
        inner: &mut Inner,
        reason: StopReason,
        exit: TimerExit,
    ) -> Result<Option<ArtifactReceipt>> {
        let Some(session) = inner.recording.take() else {
            return Ok(None);
        };
        let id = session.id();
        let started_at = session.end(exit);

        if let Err(e) = inner.camera.flush_clip().await {
            log::warn!("Failed to flush recording {}: {}", id, e);
        }
        let data = inner.camera.finish_clip().await?;

        if data.is_empty() {
            log::warn!("Recording {} ended ({:?}) without data", id, reason);
            return Ok(None);
        }

        let artifact = CapturedArtifact::new(ArtifactKind::Video, Local::now(), data);
        let receipt = artifact.receipt();
        self.shared.sink.deliver(artifact).await?;
        self.shared.notifier.notify(Notification::RecordingSaved);

        log::info!(
            "Recording {} ({:?}) saved as {}, {} bytes, started {}",
            id,
            reason,
            receipt.filename,
            receipt.size_bytes,
            started_at.format("%H:%M:%S")
        );
        Ok(Some(receipt))
    }

    /// Enable the camera if needed and wait for the stream to deliver frames.
    /// A camera enabled here is switched back off when it never gets ready.
    async fn ensure_camera(&self, inner: &mut Inner) -> Result<()> {
        let newly_enabled = inner.camera.enable(self.shared.provider.as_ref()).await?;
        if newly_enabled {
            self.publish(inner);
        }

        let timeout = self.shared.config.camera.readiness_timeout();
        if let Err(e) = inner.camera.wait_ready(timeout).await {
            if newly_enabled {
                inner.camera.disable().await;
            }
            return Err(e);
        }
        Ok(())
    }

    fn arm_auto_stop(&self, id: Uuid) -> AutoStopTimer {
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        AutoStopTimer::arm(self.shared.config.recording.max_clip_duration(), async move {
            if let Some(shared) = weak.upgrade() {
                let controller = Controller { shared };
                if let Err(e) = controller.auto_stop(id).await {
                    log::error!("Auto-stop of recording {} failed: {}", id, e);
                }
            }
        })
    }

    /// Marks the transition in flight before waiting for the lock, so
    /// intents arriving while the stop is pending are ignored.
    async fn auto_stop(&self, id: Uuid) -> Result<()> {
        let _transition = TransitionGuard::force(&self.shared.transitions);
        let mut inner = self.shared.inner.lock().await;

        if inner.recording.as_ref().map(|s| s.id()) != Some(id) {
            log::debug!("Stale auto-stop for recording {} ignored", id);
            return Ok(());
        }

        log::info!(
            "Recording {} reached the {}ms ceiling",
            id,
            self.shared.config.recording.max_clip_duration_ms
        );
        let result = self
            .finish_locked(&mut inner, StopReason::AutoSegment, TimerExit::Fired)
            .await;
        self.publish(&inner);
        self.surface(result).map(|_| ())
    }

    fn publish(&self, inner: &Inner) {
        check_invariant!(
            inner.recording.as_ref().map_or(true, |s| s.timer_armed()),
            TIMER_IFF_RECORDING,
            "Controller::publish"
        );
        self.shared.state_tx.send_replace(snapshot_state(inner));
    }

    /// Report a failure once: log it, and tell the user when the camera is
    /// missing.
    fn surface<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_stream_unavailable() {
                self.shared.notifier.notify(Notification::CameraNotFound);
            }
            log::error!("{}", e);
        }
        result
    }
}

#[async_trait]
impl PresenceSignal for Controller {
    /// Start a silent recording when auto-record is on, the camera is live
    /// and nothing is recording yet.
    async fn on_detected(&self) {
        let Some(_transition) = TransitionGuard::try_acquire(&self.shared.transitions) else {
            return;
        };
        let mut inner = self.shared.inner.lock().await;
        if !inner.auto_record || !inner.camera.is_enabled() || inner.recording.is_some() {
            return;
        }

        let result = self.start_locked(&mut inner, StartTrigger::Presence, false).await;
        self.publish(&inner);
        let _ = self.surface(result);
    }

    /// Stop a recording the presence signal started; user recordings keep going.
    async fn on_lost(&self) {
        let Some(_transition) = TransitionGuard::try_acquire(&self.shared.transitions) else {
            return;
        };
        let mut inner = self.shared.inner.lock().await;
        if inner.recording.as_ref().map(|s| s.trigger()) != Some(StartTrigger::Presence) {
            return;
        }

        let result = self
            .finish_locked(&mut inner, StopReason::PresenceLost, TimerExit::Cancel)
            .await;
        self.publish(&inner);
        let _ = self.surface(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CollectingNotifier, CollectingSink, RecordingCue, SyntheticStreamProvider};

    fn controller() -> (Controller, Arc<CollectingSink>, Arc<RecordingCue>) {
        let sink = Arc::new(CollectingSink::default());
        let cue = Arc::new(RecordingCue::default());
        let controller = Controller::builder(Arc::new(SyntheticStreamProvider::new()))
            .sink(sink.clone())
            .cue(cue.clone())
            .notifier(Arc::new(CollectingNotifier::default()))
            .build()
            .unwrap();
        (controller, sink, cue)
    }

    #[test]
    fn test_transition_guard_excludes_second_acquire() {
        let counter = AtomicUsize::new(0);
        let first = TransitionGuard::try_acquire(&counter);
        assert!(first.is_some());
        assert!(TransitionGuard::try_acquire(&counter).is_none());

        drop(first);
        assert!(TransitionGuard::try_acquire(&counter).is_some());
    }

    #[test]
    fn test_forced_guard_blocks_try_acquire() {
        let counter = AtomicUsize::new(0);
        let forced = TransitionGuard::force(&counter);
        assert!(TransitionGuard::try_acquire(&counter).is_none());
        drop(forced);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = CamwatchConfig::default();
        config.audio.default_volume = 2.0;
        let result = Controller::builder(Arc::new(SyntheticStreamProvider::new()))
            .config(config)
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_initial_state() {
        let (controller, _, _) = controller();
        let state = controller.state();
        assert!(!state.camera_on);
        assert!(state.mirrored);
        assert!(!state.is_recording);
        assert!(!state.auto_record_enabled);
        assert_eq!(state.volume, 0.8);
        assert_eq!(controller.recording_state(), RecordingState::Idle);
    }

    #[tokio::test]
    async fn test_in_flight_transition_ignores_toggle() {
        let (controller, sink, _) = controller();
        controller.enable_camera().await.unwrap();

        let held = TransitionGuard::try_acquire(&controller.shared.transitions);
        assert_eq!(
            controller.toggle_recording().await.unwrap(),
            RecordingToggle::Ignored
        );
        assert!(!controller.start_recording().await.unwrap());
        drop(held);

        assert!(!controller.state().is_recording);
        assert!(sink.artifacts().is_empty());
    }

    #[tokio::test]
    async fn test_preview_uses_current_volume() {
        let (controller, _, cue) = controller();
        controller.set_volume(0.4).await.unwrap();
        assert!(cue.volumes().is_empty(), "setting the volume is silent");

        controller.preview_volume().await;
        assert_eq!(cue.volumes(), vec![0.4]);
    }
}
