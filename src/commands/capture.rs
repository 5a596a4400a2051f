//! Tauri commands for the camera and stills

use tauri::command;

use super::installed;
use crate::artifacts::ArtifactReceipt;
use crate::types::ControllerState;

/// Turn the camera on
#[command]
pub async fn enable_camera() -> Result<ControllerState, String> {
    let controller = installed().await?;
    controller.enable_camera().await.map_err(|e| e.to_string())?;
    Ok(controller.state())
}

/// Turn the camera off, saving any clip in progress first
#[command]
pub async fn disable_camera() -> Result<Option<ArtifactReceipt>, String> {
    let controller = installed().await?;
    controller.disable_camera().await.map_err(|e| e.to_string())
}

#[command]
pub async fn toggle_mirror() -> Result<bool, String> {
    Ok(installed().await?.toggle_mirror().await)
}

/// Capture a PNG still, enabling the camera when needed
#[command]
pub async fn take_snapshot() -> Result<ArtifactReceipt, String> {
    let controller = installed().await?;
    match controller.take_snapshot().await {
        Ok(receipt) => Ok(receipt),
        Err(e) => Err(format!("Failed to take snapshot: {}", e)),
    }
}

#[command]
pub async fn get_controller_state() -> Result<ControllerState, String> {
    Ok(installed().await?.state())
}
