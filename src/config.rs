//! Persistent configuration handling for SnapText.
//!
//! Persists configuration in a JSON file:
//! `~/.config/snaptext/config.json`.
//!
//! `RawConfig` mirrors the file (every field optional, unknown fields
//! ignored); `Settings` is the resolved view the rest of the app consumes,
//! with defaults filled in. The OCR endpoint resolves as config file, then
//! the `SNAPTEXT_OCR_BASE_URL` environment variable, then the OpenAI
//! default.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use dirs::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const APP_CONFIG_DIR_NAME: &str = "snaptext";
const CONFIG_FILE_NAME: &str = "config.json";

/// Environment variable that overrides the OCR endpoint base URL.
pub const BASE_URL_ENV: &str = "SNAPTEXT_OCR_BASE_URL";

/// Default name of the environment variable holding the API credential.
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_PROMPT: &str =
    "You are an OCR tool. Extract and transcribe all text from the provided image.";
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 2000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No config directory available on this platform")]
    NoConfigDir,
}

/// On-disk shape: every field optional so partial files keep working.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawConfig {
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub ocr_base_url: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub retry_delay_ms: Option<u64>,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    #[serde(default)]
    pub raise_on_capture: Option<bool>,
    #[serde(default)]
    pub hotkey_enabled: Option<bool>,
}

/// Resolved configuration consumed by the watcher, coordinator and OCR client.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key_env: String,
    pub model: String,
    pub ocr_base_url: String,
    pub prompt: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub poll_interval: Duration,
    pub raise_on_capture: bool,
    pub hotkey_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        resolve(RawConfig::default())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Fills defaults into a raw file image. Base URL precedence: config file,
/// then `SNAPTEXT_OCR_BASE_URL`, then the OpenAI default.
fn resolve(raw: RawConfig) -> Settings {
    let ocr_base_url = non_empty(raw.ocr_base_url)
        .or_else(|| non_empty(std::env::var(BASE_URL_ENV).ok()))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    Settings {
        api_key_env: non_empty(raw.api_key_env)
            .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
        model: non_empty(raw.model).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        ocr_base_url: ocr_base_url.trim_end_matches('/').to_string(),
        prompt: non_empty(raw.prompt).unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
        max_retries: raw.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        retry_delay: Duration::from_millis(
            raw.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS),
        ),
        poll_interval: Duration::from_millis(
            raw.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        ),
        raise_on_capture: raw.raise_on_capture.unwrap_or(true),
        hotkey_enabled: raw.hotkey_enabled.unwrap_or(true),
    }
}

fn config_path() -> Option<PathBuf> {
    let path = config_dir()?
        .join(APP_CONFIG_DIR_NAME)
        .join(CONFIG_FILE_NAME);
    Some(path)
}

fn ensure_config_dir_exists(path: &std::path::Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn load_raw_config() -> Result<RawConfig, ConfigError> {
    let Some(path) = config_path() else {
        debug!("No config_dir available, using defaults only");
        return Ok(RawConfig::default());
    };

    if !path.exists() {
        debug!(?path, "Config file does not exist, using defaults");
        return Ok(RawConfig::default());
    }

    let data = fs::read_to_string(&path)?;
    let cfg = serde_json::from_str(&data)?;
    debug!(?path, "Config loaded");
    Ok(cfg)
}

pub fn save_raw_config(cfg: RawConfig) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    ensure_config_dir_exists(&path)?;
    let data = serde_json::to_string_pretty(&cfg)?;
    fs::write(&path, data)?;
    debug!(?path, "Config saved");
    Ok(())
}

/// Loads settings for startup composition. A broken config file degrades to
/// defaults rather than failing the app.
pub fn load_settings() -> Settings {
    match load_raw_config() {
        Ok(raw) => resolve(raw),
        Err(err) => {
            warn!(error = ?err, "Failed to load existing config, using defaults");
            Settings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_raw_config_resolves_to_defaults() {
        let settings = resolve(RawConfig::default());
        assert_eq!(settings.api_key_env, DEFAULT_API_KEY_ENV);
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.ocr_base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.retry_delay, Duration::from_secs(2));
        assert_eq!(settings.poll_interval, Duration::from_secs(1));
        assert!(settings.raise_on_capture);
        assert!(settings.hotkey_enabled);
    }

    #[test]
    fn blank_strings_fall_back_to_defaults() {
        let raw = RawConfig {
            model: Some("  ".to_string()),
            prompt: Some(String::new()),
            ..RawConfig::default()
        };
        let settings = resolve(raw);
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.prompt, DEFAULT_PROMPT);
    }

    #[test]
    fn configured_base_url_wins_and_is_normalized() {
        let raw = RawConfig {
            ocr_base_url: Some("http://localhost:9999/v1/".to_string()),
            ..RawConfig::default()
        };
        assert_eq!(resolve(raw).ocr_base_url, "http://localhost:9999/v1");
    }

    #[test]
    fn partial_file_keeps_unset_fields_at_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"max_retries": 5, "poll_interval_ms": 250}"#).unwrap();
        let settings = resolve(raw);
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
        assert_eq!(settings.retry_delay, Duration::from_secs(2));
    }
}
