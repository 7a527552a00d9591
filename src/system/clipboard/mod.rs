//! Clipboard access seams.
//!
//! The watcher reads images through `ImageSource` and the coordinator writes
//! recognized text through `TextSink`; `SystemClipboard` implements both on
//! top of `arboard`. A fresh `Clipboard` handle is opened per access; the
//! handles are cheap and holding one open can block other applications on
//! some platforms. Reads fail soft: non-image content, an inaccessible
//! clipboard, or malformed pixel data all come back as `None`.

use arboard::Clipboard;
use image::{DynamicImage, RgbaImage};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard access failed: {0}")]
    Access(#[from] arboard::Error),
}

/// Source of clipboard images. The system implementation samples the real
/// clipboard; tests substitute scripted sources.
pub trait ImageSource: Send + 'static {
    /// Current clipboard image, or `None` when the clipboard holds no image
    /// or cannot be read. Never fails hard.
    fn capture_image(&mut self) -> Option<DynamicImage>;
}

/// Destination for recognized text (the same system clipboard, on the write
/// side).
pub trait TextSink: Send + Sync + 'static {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// `arboard`-backed implementation of both seams.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl ImageSource for SystemClipboard {
    fn capture_image(&mut self) -> Option<DynamicImage> {
        let mut clipboard = match Clipboard::new() {
            Ok(clipboard) => clipboard,
            Err(e) => {
                debug!(error = %e, "Clipboard unavailable");
                return None;
            }
        };

        match clipboard.get_image() {
            Ok(data) => {
                let (width, height) = (data.width as u32, data.height as u32);
                match RgbaImage::from_raw(width, height, data.bytes.into_owned()) {
                    Some(buffer) => Some(DynamicImage::ImageRgba8(buffer)),
                    None => {
                        debug!(width, height, "Clipboard image had inconsistent dimensions");
                        None
                    }
                }
            }
            // Clipboard holds text, files, or nothing; not an error worth logging.
            Err(arboard::Error::ContentNotAvailable) => None,
            Err(e) => {
                debug!(error = %e, "Failed to read clipboard image");
                None
            }
        }
    }
}

impl TextSink for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard = Clipboard::new()?;
        clipboard.set_text(text)?;
        debug!(len = text.len(), "Recognized text copied to clipboard");
        Ok(())
    }
}

impl<T: TextSink> TextSink for std::sync::Arc<T> {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        (**self).write_text(text)
    }
}
