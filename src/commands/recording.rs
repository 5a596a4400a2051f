//! Tauri commands for clip recording

use tauri::command;

use super::installed;
use crate::controller::RecordingToggle;

/// Start a clip when idle, stop and save it when recording
#[command]
pub async fn toggle_recording() -> Result<RecordingToggle, String> {
    let controller = installed().await?;
    controller
        .toggle_recording()
        .await
        .map_err(|e| format!("Failed to toggle recording: {}", e))
}

/// Flip auto-record; returns the new setting
#[command]
pub async fn toggle_auto_record() -> Result<bool, String> {
    Ok(installed().await?.toggle_auto_record().await)
}
