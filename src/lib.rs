//! camwatch: camera capture and clip recording controller
//!
//! Owns a live camera stream, takes PNG stills, records WebM clips that are
//! cut automatically after 30 seconds, plays an audible cue on capture and
//! exposes an auto-record preference an external presence detector can act
//! on.
//!
//! # Features
//! - `audio`: cue tone on the default output device
//! - `native`: hardware camera via nokhwa, WebM clips via ffmpeg
//! - `plugin`: Tauri plugin with one command per user intent
//!
//! # Usage
//! ```rust,ignore
//! use std::sync::Arc;
//! use camwatch::media::native::NativeStreamProvider;
//! use camwatch::Controller;
//!
//! let controller = Controller::builder(Arc::new(NativeStreamProvider::default())).build()?;
//! controller.take_snapshot().await?;
//! ```
//!
//! As a Tauri plugin:
//! ```rust,ignore
//! tauri::Builder::default()
//!     .plugin(camwatch::init())
//!     .setup(|app| {
//!         let controller = camwatch::Controller::builder(provider)
//!             .notifier(Arc::new(camwatch::commands::EventNotifier::new(app.handle().clone())))
//!             .build()?;
//!         tauri::async_runtime::block_on(camwatch::commands::install_controller(controller));
//!         Ok(())
//!     })
//!     .run(tauri::generate_context!())
//!     .expect("error while running tauri application");
//! ```
pub mod artifacts;
pub mod audio;
pub mod camera;
#[cfg(feature = "plugin")]
pub mod commands;
pub mod config;
pub mod controller;
pub mod errors;
pub mod invariants;
pub mod media;
pub mod notify;
pub mod presence;
pub mod recording;
pub mod snapshot;
pub mod types;

// Testing utilities - synthetic streams and in-memory collaborators
pub mod testing;

// Re-exports for convenience
pub use artifacts::{ArtifactKind, ArtifactReceipt, ArtifactSink, CapturedArtifact, DownloadDirSink};
pub use audio::{AudioCue, SilentCue, VolumeSetting};
pub use config::CamwatchConfig;
pub use controller::{Controller, ControllerBuilder, RecordingToggle};
pub use errors::{CaptureError, Result};
pub use media::{MediaStream, MediaStreamProvider};
pub use notify::{ChannelNotifier, LogNotifier, Notification, Notifier};
pub use presence::PresenceSignal;
pub use types::{ControllerState, Frame, PixelFormat, StartTrigger, StopReason};

#[cfg(feature = "plugin")]
use tauri::{
    plugin::{Builder, TauriPlugin},
    Runtime,
};

/// Initialize the camwatch plugin with all commands
#[cfg(feature = "plugin")]
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("camwatch")
        .invoke_handler(tauri::generate_handler![
            commands::capture::enable_camera,
            commands::capture::disable_camera,
            commands::capture::toggle_mirror,
            commands::capture::take_snapshot,
            commands::capture::get_controller_state,
            commands::recording::toggle_recording,
            commands::recording::toggle_auto_record,
            commands::audio::set_volume,
        ])
        .build()
}

/// Initialize logging for camwatch
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "camwatch=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_version_info() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "camwatch");
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }
}
