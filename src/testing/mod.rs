//! Testing utilities for camwatch
//!
//! A hardware-free stream backend plus in-memory collaborators, so the
//! controller can be driven end to end in unit and integration tests.

pub mod fakes;
pub mod synthetic_data;

pub use fakes::{CollectingNotifier, CollectingSink, RecordingCue};
pub use synthetic_data::{
    synthetic_frame, StreamStats, SyntheticStreamProvider, WEBM_MAGIC,
};
