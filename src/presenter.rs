//! Presentation-layer notifications.
//!
//! The core never talks to widgets; it emits through the `Presenter` trait.
//! `TauriPresenter` maps each notification onto a Tauri event consumed by the
//! frontend, except bring-to-front which acts on the main window directly.
//! Tests substitute a recording implementation.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use tauri::{AppHandle, Emitter, Manager};
use tracing::warn;

use crate::capture::Preview;

/// Emitted when the watcher detects a new clipboard image.
pub const NEW_IMAGE_EVENT: &str = "new-image";
/// Emitted with `true`/`false` when an OCR attempt starts/finishes.
pub const PROCESSING_STATE_EVENT: &str = "processing-state";
/// Emitted with the recognized text on success.
pub const RESULT_EVENT: &str = "ocr-result";
/// Emitted with a user-readable message on any failure.
pub const ERROR_EVENT: &str = "ocr-error";

/// Payload of `NEW_IMAGE_EVENT`; also returned by the `current_preview`
/// command so a (re)loading frontend can catch up.
#[derive(Debug, Clone, Serialize)]
pub struct NewImagePayload {
    /// PNG data URL, sized for the main-window preview.
    pub image: String,
    pub width: u32,
    pub height: u32,
}

impl From<&Preview> for NewImagePayload {
    fn from(preview: &Preview) -> Self {
        Self {
            image: png_data_url(&preview.png),
            width: preview.width,
            height: preview.height,
        }
    }
}

/// Wraps PNG bytes in a `data:` URL the webview can render directly.
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png))
}

/// Core-to-presentation notifications. Strictly one-way; the core never
/// waits on the UI.
pub trait Presenter: Send + Sync + 'static {
    fn new_image(&self, preview: &Preview);
    fn bring_to_front(&self);
    fn busy_changed(&self, busy: bool);
    fn show_result(&self, text: &str);
    fn show_error(&self, message: &str);
}

impl<T: Presenter> Presenter for Arc<T> {
    fn new_image(&self, preview: &Preview) {
        (**self).new_image(preview)
    }
    fn bring_to_front(&self) {
        (**self).bring_to_front()
    }
    fn busy_changed(&self, busy: bool) {
        (**self).busy_changed(busy)
    }
    fn show_result(&self, text: &str) {
        (**self).show_result(text)
    }
    fn show_error(&self, message: &str) {
        (**self).show_error(message)
    }
}

/// Event-emitting presenter used by the running app.
pub struct TauriPresenter {
    app: AppHandle,
}

impl TauriPresenter {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    fn emit<S: Serialize + Clone>(&self, event: &str, payload: S) {
        if let Err(e) = self.app.emit(event, payload) {
            warn!(event, error = %e, "Failed to emit event");
        }
    }
}

impl Presenter for TauriPresenter {
    fn new_image(&self, preview: &Preview) {
        self.emit(NEW_IMAGE_EVENT, NewImagePayload::from(preview));
    }

    fn bring_to_front(&self) {
        let Some(window) = self.app.get_webview_window("main") else {
            warn!("Main window not found, cannot bring to front");
            return;
        };
        let _ = window.show();
        let _ = window.unminimize();
        let _ = window.set_focus();
    }

    fn busy_changed(&self, busy: bool) {
        self.emit(PROCESSING_STATE_EVENT, busy);
    }

    fn show_result(&self, text: &str) {
        self.emit(RESULT_EVENT, text.to_string());
    }

    fn show_error(&self, message: &str) {
        self.emit(ERROR_EVENT, message.to_string());
    }
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use super::*;

    /// What a presenter saw, in order.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Notification {
        NewImage { width: u32, height: u32 },
        BringToFront,
        Busy(bool),
        Result(String),
        Error(String),
    }

    #[derive(Debug, Default)]
    pub struct RecordingPresenter {
        notifications: Mutex<Vec<Notification>>,
    }

    impl RecordingPresenter {
        pub fn seen(&self) -> Vec<Notification> {
            self.notifications.lock().unwrap().clone()
        }

        pub fn count(&self, matches: impl Fn(&Notification) -> bool) -> usize {
            self.seen().iter().filter(|n| matches(n)).count()
        }

        fn record(&self, notification: Notification) {
            self.notifications.lock().unwrap().push(notification);
        }
    }

    impl Presenter for RecordingPresenter {
        fn new_image(&self, preview: &Preview) {
            self.record(Notification::NewImage {
                width: preview.width,
                height: preview.height,
            });
        }
        fn bring_to_front(&self) {
            self.record(Notification::BringToFront);
        }
        fn busy_changed(&self, busy: bool) {
            self.record(Notification::Busy(busy));
        }
        fn show_result(&self, text: &str) {
            self.record(Notification::Result(text.to_string()));
        }
        fn show_error(&self, message: &str) {
            self.record(Notification::Error(message.to_string()));
        }
    }
}
