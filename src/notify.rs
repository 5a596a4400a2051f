//! User-visible message channel
//!
//! Rendering (toasts, banners) belongs to the presentation layer; the
//! controller only emits [`Notification`] values.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Notification {
    CameraNotFound,
    RecordingSaved,
    AutoRecord { enabled: bool },
}

impl Notification {
    pub fn message(&self) -> &'static str {
        match self {
            Notification::CameraNotFound => "Camera not found. Please refresh.",
            Notification::RecordingSaved => "Recording saved to downloads",
            Notification::AutoRecord { enabled: true } => "Autorecord enabled",
            Notification::AutoRecord { enabled: false } => "Autorecord disabled",
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Fire-and-forget sink for notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Forwards notifications over an unbounded channel
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            log::debug!("Notification receiver dropped");
        }
    }
}

/// Writes notifications to the log, for hosts without a UI
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        log::info!("{}", notification);
    }
}
