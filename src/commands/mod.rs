//! Tauri commands over the installed [`Controller`]
//!
//! The host app builds a controller with the backends it wants and hands it
//! to [`install_controller`]; every command then drives that one instance.

pub mod audio;
pub mod capture;
pub mod recording;

pub use audio::*;
pub use capture::*;
pub use recording::*;

use std::sync::Arc;

use tauri::{AppHandle, Emitter, Runtime};
use tokio::sync::RwLock;

use crate::controller::Controller;
use crate::notify::{Notification, Notifier};

/// Event name notifications are emitted under
pub const NOTIFICATION_EVENT: &str = "camwatch://notification";

lazy_static::lazy_static! {
    static ref CONTROLLER: Arc<RwLock<Option<Controller>>> = Arc::new(RwLock::new(None));
}

/// Make `controller` the target of every command, replacing any previous one
pub async fn install_controller(controller: Controller) {
    let mut slot = CONTROLLER.write().await;
    if let Some(previous) = slot.replace(controller) {
        if let Err(e) = previous.shutdown().await {
            log::warn!("Failed to shut down replaced controller: {}", e);
        }
    }
}

pub(crate) async fn installed() -> Result<Controller, String> {
    CONTROLLER
        .read()
        .await
        .clone()
        .ok_or_else(|| "Camera controller not initialized".to_string())
}

/// Forwards notifications to the webview as events
pub struct EventNotifier<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> EventNotifier<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self { app }
    }
}

impl<R: Runtime> Notifier for EventNotifier<R> {
    fn notify(&self, notification: Notification) {
        if let Err(e) = self.app.emit(NOTIFICATION_EVENT, notification.message()) {
            log::warn!("Failed to emit notification: {}", e);
        }
    }
}
