//! Global keyboard shortcut for processing the current capture.
//!
//! Registers one fixed shortcut (Cmd+Shift+O on macOS, Ctrl+Shift+O
//! elsewhere) with the Tauri global shortcut plugin so a capture can be
//! processed without focusing the window first. On Wayland, native global
//! shortcuts are not supported, so registration is skipped and the in-window
//! button remains the only trigger. Called from lib's setup and refreshed
//! from save_config when the user toggles the feature.

use std::sync::Arc;

use tauri::Manager;
use tauri_plugin_global_shortcut::{Code, GlobalShortcutExt, Modifiers, Shortcut, ShortcutState};
use tracing::{debug, warn};

use crate::AppState;

/// The process-current-capture shortcut.
fn process_shortcut() -> Shortcut {
    #[cfg(target_os = "macos")]
    let modifiers = Modifiers::SUPER | Modifiers::SHIFT;
    #[cfg(not(target_os = "macos"))]
    let modifiers = Modifiers::CONTROL | Modifiers::SHIFT;

    Shortcut::new(Some(modifiers), Code::KeyO)
}

fn is_wayland_session() -> bool {
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_SESSION_TYPE")
            .map(|s| s.to_lowercase() == "wayland")
            .unwrap_or(false)
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

/// Registers the process shortcut when the platform supports it.
pub fn register(app: &tauri::AppHandle) {
    if is_wayland_session() {
        warn!("Native global shortcuts are not supported on Wayland, skipping registration");
        return;
    }

    if let Err(e) = app.global_shortcut().register(process_shortcut()) {
        warn!(error = %e, "Failed to register process shortcut");
    }
}

/// Re-applies the registration after a config change.
pub fn refresh(app: &tauri::AppHandle, enabled: bool) {
    if let Err(e) = app.global_shortcut().unregister_all() {
        warn!(error = %e, "Failed to clear global shortcuts");
        return;
    }
    if enabled {
        register(app);
    }
}

/// Called by the global shortcut plugin when a registered key fires.
pub fn on_shortcut(app: &tauri::AppHandle, shortcut: &Shortcut, state: ShortcutState) {
    if state != ShortcutState::Pressed || *shortcut != process_shortcut() {
        return;
    }

    let Some(app_state) = app.try_state::<AppState>() else {
        warn!("Process shortcut fired before app state was ready");
        return;
    };

    debug!("Process shortcut pressed");
    let processor = Arc::clone(&app_state.processor);
    tauri::async_runtime::spawn(async move {
        processor.trigger();
    });
}
