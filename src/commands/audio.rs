//! Tauri commands for the audio cue

use tauri::command;

use super::installed;

/// Set the cue volume and play a preview at the new level.
/// Values outside `0.0..=1.0` are clamped.
#[command]
pub async fn set_volume(level: f32) -> Result<f32, String> {
    let controller = installed().await?;
    let applied = controller.set_volume(level).await.map_err(|e| e.to_string())?;
    controller.preview_volume().await;
    Ok(applied)
}
