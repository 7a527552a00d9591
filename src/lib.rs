// Learn more about Tauri commands at https://tauri.app/develop/calling-rust/
mod capture;
mod commands_config;
mod commands_processing;
mod config;
mod fingerprint;
mod hotkeys;
mod ocr;
mod presenter;
mod processing;
mod system;
mod watcher;
mod windows;

use std::sync::{Arc, Mutex};

use tauri::Manager;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use capture::CurrentImage;
use ocr::{OcrClient, OcrConfig};
use presenter::TauriPresenter;
use processing::Processor;
use system::SystemClipboard;
use watcher::ClipboardWatcher;

/// Shared handles the commands and the hotkey handler operate on.
pub struct AppState {
    pub processor: Arc<Processor<Arc<TauriPresenter>, SystemClipboard>>,
    pub current: CurrentImage,
    watcher_cancel: CancellationToken,
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_window_state::Builder::default().build())
        .plugin(
            tauri_plugin_global_shortcut::Builder::new()
                .with_handler(|app, shortcut, event| {
                    hotkeys::on_shortcut(app, shortcut, event.state())
                })
                .build(),
        )
        .invoke_handler(tauri::generate_handler![
            commands_processing::trigger_processing,
            commands_processing::processing_state,
            commands_processing::current_preview,
            commands_processing::current_image_data,
            commands_config::get_config,
            commands_config::save_config,
            commands_config::persist_api_key,
            windows::open_preview_window,
        ])
        .setup(|app| {
            let settings = config::load_settings();

            let presenter = Arc::new(TauriPresenter::new(app.handle().clone()));
            let current = CurrentImage::default();
            let ocr = OcrClient::new(OcrConfig {
                base_url: settings.ocr_base_url.clone(),
                model: settings.model.clone(),
                api_key_env: settings.api_key_env.clone(),
            })?;
            let processor = Arc::new(Processor::new(
                ocr,
                Arc::clone(&presenter),
                SystemClipboard,
                current.clone(),
                &settings,
            ));

            let watcher_cancel = CancellationToken::new();
            let watcher = ClipboardWatcher::new(
                SystemClipboard,
                presenter,
                current.clone(),
                settings.raise_on_capture,
            );
            tauri::async_runtime::spawn(
                watcher.run(settings.poll_interval, watcher_cancel.clone()),
            );

            if settings.hotkey_enabled {
                hotkeys::register(app.handle());
            }

            let raw_config = config::load_raw_config().unwrap_or_default();
            app.manage::<commands_config::ConfigState>(Arc::new(Mutex::new(raw_config)));
            app.manage(AppState {
                processor,
                current,
                watcher_cancel,
            });
            Ok(())
        })
        .build(tauri::generate_context!());

    let app = match app {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "Error while building Tauri application");
            std::process::exit(1);
        }
    };

    app.run(|app, event| {
        if let tauri::RunEvent::Exit = event {
            if let Some(state) = app.try_state::<AppState>() {
                state.watcher_cancel.cancel();
            }
            info!("Shutting down");
        }
    });
}
