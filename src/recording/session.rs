use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timer::AutoStopTimer;
use crate::types::StartTrigger;

/// Recording state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
}

/// An in-progress clip. Owns the one auto-stop timer tied to it; ending the
/// session through [`RecordingSession::end`] always disposes of that timer.
#[derive(Debug)]
pub struct RecordingSession {
    id: Uuid,
    started_at: DateTime<Local>,
    trigger: StartTrigger,
    timer: AutoStopTimer,
}

/// How the session's timer is disposed of when the session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerExit {
    /// Abort the pending callback
    Cancel,
    /// The callback is the caller; release it without aborting
    Fired,
}

impl RecordingSession {
    pub fn new(id: Uuid, trigger: StartTrigger, timer: AutoStopTimer) -> Self {
        Self {
            id,
            started_at: Local::now(),
            trigger,
            timer,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn trigger(&self) -> StartTrigger {
        self.trigger
    }

    pub fn timer_armed(&self) -> bool {
        self.timer.is_armed()
    }

    /// Dispose of the timer and return when the session started
    pub fn end(self, exit: TimerExit) -> DateTime<Local> {
        match exit {
            TimerExit::Cancel => self.timer.cancel(),
            TimerExit::Fired => self.timer.disarm(),
        }
        self.started_at
    }
}
