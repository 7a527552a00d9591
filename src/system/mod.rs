//! System interactions (clipboard read/write seams).

pub mod clipboard;

pub use clipboard::{ClipboardError, ImageSource, SystemClipboard, TextSink};
