//! Tauri commands for configuration and the API-key utility.
//!
//! Config reads/writes go through the shared ConfigState so the settings UI
//! always sees its own latest save. Endpoint, prompt, retry and polling
//! changes apply on the next launch; only the global shortcut is refreshed
//! immediately. persist_api_key is the companion utility from the settings
//! form: it stores the credential in the user's environment-variable store
//! (Windows `setx`) and in the current process.

use std::sync::{Arc, Mutex};

use tauri::{Emitter, State};

use crate::config::{self, RawConfig, DEFAULT_API_KEY_ENV};
use crate::hotkeys;

/// Shared config state type used by these commands and by lib's composition root.
pub type ConfigState = Arc<Mutex<RawConfig>>;

#[tauri::command]
pub fn get_config(state: State<'_, ConfigState>) -> Result<RawConfig, String> {
    let cfg = state
        .lock()
        .map_err(|_| "Config lock poisoned".to_string())?;
    Ok(cfg.clone())
}

#[tauri::command]
pub fn save_config(
    app: tauri::AppHandle,
    state: State<'_, ConfigState>,
    config_json: String,
) -> Result<(), String> {
    let cfg: RawConfig = serde_json::from_str(&config_json)
        .map_err(|e| format!("Failed to parse config JSON: {}", e))?;
    {
        let mut shared = state
            .lock()
            .map_err(|_| "Config lock poisoned".to_string())?;
        *shared = cfg.clone();
    }
    config::save_raw_config(cfg.clone()).map_err(|e| e.to_string())?;

    hotkeys::refresh(&app, cfg.hotkey_enabled.unwrap_or(true));

    let _ = app.emit("config-changed", ());
    Ok(())
}

/// Persists an API credential under the given environment variable name for
/// future launches, and exports it into the current process so the next OCR
/// attempt picks it up. An empty name falls back to the default variable.
#[tauri::command]
pub fn persist_api_key(name: String, value: String) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("API key field must be filled out.".to_string());
    }

    let name = name.trim();
    let name = if name.is_empty() {
        DEFAULT_API_KEY_ENV
    } else {
        name
    };
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err("Variable name may only contain letters, digits and underscores.".to_string());
    }

    std::env::set_var(name, value);
    persist_env_var(name, value)?;
    Ok(format!("API key saved as {name}."))
}

#[cfg(target_os = "windows")]
fn persist_env_var(name: &str, value: &str) -> Result<(), String> {
    use std::process::Command;

    let status = Command::new("setx")
        .arg(name)
        .arg(value)
        .status()
        .map_err(|e| format!("Failed to run setx: {e}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("setx exited with {status}"))
    }
}

#[cfg(not(target_os = "windows"))]
fn persist_env_var(name: &str, _value: &str) -> Result<(), String> {
    tracing::warn!(name, "Persistent environment variables are only supported on Windows");
    Err(
        "Saved for this session only; persisting environment variables is not supported on this platform."
            .to_string(),
    )
}
