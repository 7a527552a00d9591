//! Webview URL construction and preview window lifecycle.
//!
//! Builds the correct URL for loading HTML (dev server vs packed app path)
//! and provides the create-or-focus behavior for the full-resolution preview
//! window. The preview content itself is rendered by dist/preview.html from
//! the current_image_data command.

use tauri::{Emitter, Manager, WebviewUrl, WebviewWindowBuilder};

use crate::AppState;

/// Builds a WebviewUrl for the given HTML file path.
/// In dev mode, uses the configured dev_url or defaults to localhost:1420.
/// In production, uses the app path.
fn build_webview_url(app: &tauri::AppHandle, html_path: &str) -> Result<WebviewUrl, String> {
    if tauri::is_dev() {
        let base = app
            .config()
            .build
            .dev_url
            .as_ref()
            .map(|u| u.as_str().trim_end_matches('/').to_string())
            .unwrap_or_else(|| "http://localhost:1420".to_string());
        let url = format!("{}/{}", base, html_path);
        Ok(WebviewUrl::External(
            url.parse().map_err(|e| format!("dev_url parse: {}", e))?,
        ))
    } else {
        Ok(WebviewUrl::App(format!("/{}", html_path).into()))
    }
}

/// Shows the full-resolution preview of the current capture, creating the
/// window on first use and focusing it afterwards. Errors when no image has
/// been captured yet.
#[tauri::command]
pub fn open_preview_window(
    app: tauri::AppHandle,
    state: tauri::State<'_, AppState>,
) -> Result<(), String> {
    if state.current.get().is_none() {
        return Err("No image to display.".to_string());
    }

    if let Some(win) = app.get_webview_window("preview") {
        let _ = win.show(); // restore if the user had "closed" it
        win.set_focus().map_err(|e| e.to_string())?;
        let _ = win.emit("preview-refresh", ());
        return Ok(());
    }

    let url = build_webview_url(&app, "preview.html")?;
    WebviewWindowBuilder::new(&app, "preview", url)
        .title("Image Preview")
        .inner_size(440.0, 440.0)
        .min_inner_size(240.0, 240.0)
        .resizable(true)
        .build()
        .map_err(|e| e.to_string())?;

    Ok(())
}
