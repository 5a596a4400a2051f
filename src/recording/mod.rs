//! Recording session and auto-segmentation
//!
//! A [`RecordingSession`] exists only while a clip is being captured. It
//! owns the [`AutoStopTimer`] that finalizes the clip once the configured
//! ceiling (30 s by default) passes.

mod session;
mod timer;

pub use session::{RecordingSession, RecordingState, TimerExit};
pub use timer::AutoStopTimer;
