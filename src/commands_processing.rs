//! Tauri commands for the processing pipeline.
//!
//! The presentation layer's side of the core interface: trigger an OCR
//! attempt, read the coordinator state, and fetch renditions of the current
//! capture for the preview surfaces.

use tauri::State;

use crate::presenter::{png_data_url, NewImagePayload};
use crate::processing::ProcessingState;
use crate::AppState;

/// Starts an OCR attempt on the current capture. A no-op while an attempt is
/// already in flight; reports through the ocr-error event when there is no
/// capture yet.
#[tauri::command]
pub async fn trigger_processing(state: State<'_, AppState>) -> Result<(), String> {
    state.processor.trigger();
    Ok(())
}

/// Current coordinator state; the frontend uses it to initialize the trigger
/// control before any processing-state event arrives.
#[tauri::command]
pub fn processing_state(state: State<'_, AppState>) -> ProcessingState {
    state.processor.state()
}

/// Preview-sized rendition of the current capture, or None before the first
/// detection. Lets a (re)loading frontend catch up with the watcher.
#[tauri::command]
pub fn current_preview(state: State<'_, AppState>) -> Result<Option<NewImagePayload>, String> {
    match state.current.get() {
        None => Ok(None),
        Some(capture) => capture
            .preview()
            .map(|preview| Some(NewImagePayload::from(&preview)))
            .map_err(|e| e.to_string()),
    }
}

/// Full-resolution PNG data URL of the current capture, for the preview
/// window.
#[tauri::command]
pub fn current_image_data(state: State<'_, AppState>) -> Result<String, String> {
    let capture = state
        .current
        .get()
        .ok_or_else(|| "No image to display.".to_string())?;
    capture
        .full_png()
        .map(|png| png_data_url(&png))
        .map_err(|e| e.to_string())
}
