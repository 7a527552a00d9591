//! Captured clipboard images and the shared "current image" slot.
//!
//! A `CapturedImage` is created by the watcher each time a distinct image
//! shows up on the clipboard and published into `CurrentImage`, superseding
//! the previous capture. The coordinator takes an `Arc` snapshot for the
//! duration of one OCR attempt, so the watcher can keep publishing while a
//! request is in flight without any shared mutable aliasing.

use std::io::Cursor;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::fingerprint;

/// Longest edge of the preview shown in the main window, in pixels.
pub const PREVIEW_MAX_DIM: u32 = 250;

/// A clipboard image together with its content digest and capture time.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub image: DynamicImage,
    pub fingerprint: String,
    pub captured_at: SystemTime,
}

impl CapturedImage {
    pub fn new(image: DynamicImage) -> Self {
        let fingerprint = fingerprint::digest(&image);
        Self {
            image,
            fingerprint,
            captured_at: SystemTime::now(),
        }
    }

    /// Renders a PNG preview that fits `PREVIEW_MAX_DIM`, preserving aspect
    /// ratio. Images already small enough are encoded as-is, never upscaled.
    pub fn preview(&self) -> Result<Preview, image::ImageError> {
        let scaled = if self.image.width() <= PREVIEW_MAX_DIM
            && self.image.height() <= PREVIEW_MAX_DIM
        {
            self.image.clone()
        } else {
            self.image
                .resize(PREVIEW_MAX_DIM, PREVIEW_MAX_DIM, FilterType::Lanczos3)
        };
        Preview::encode(&scaled)
    }

    /// Encodes the full-resolution capture as PNG (for the preview window).
    pub fn full_png(&self) -> Result<Vec<u8>, image::ImageError> {
        encode_png(&self.image)
    }
}

/// A downscaled PNG rendition of a capture, sized for the main window.
#[derive(Debug, Clone)]
pub struct Preview {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Preview {
    fn encode(image: &DynamicImage) -> Result<Self, image::ImageError> {
        Ok(Self {
            png: encode_png(image)?,
            width: image.width(),
            height: image.height(),
        })
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// Shared handle to the most recent capture.
///
/// The watcher is the only writer; readers get cheap `Arc` snapshots. Starts
/// out empty until the first image is detected.
#[derive(Debug, Clone, Default)]
pub struct CurrentImage(Arc<Mutex<Option<Arc<CapturedImage>>>>);

impl CurrentImage {
    /// Replaces the current capture. Ownership of the previous one simply
    /// moves out; outstanding snapshots keep it alive until dropped.
    pub fn publish(&self, capture: CapturedImage) {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::new(capture));
    }

    /// Snapshot of the most recent capture, if any.
    pub fn get(&self) -> Option<Arc<CapturedImage>> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn capture(w: u32, h: u32) -> CapturedImage {
        CapturedImage::new(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            w,
            h,
            Rgba([120, 130, 140, 255]),
        )))
    }

    #[test]
    fn preview_downscales_large_captures() {
        let preview = capture(1000, 500).preview().unwrap();
        assert_eq!(preview.width, PREVIEW_MAX_DIM);
        assert_eq!(preview.height, PREVIEW_MAX_DIM / 2);
        assert!(!preview.png.is_empty());
    }

    #[test]
    fn preview_keeps_small_captures_at_native_size() {
        let preview = capture(100, 80).preview().unwrap();
        assert_eq!((preview.width, preview.height), (100, 80));
    }

    #[test]
    fn publish_supersedes_the_previous_capture() {
        let current = CurrentImage::default();
        assert!(current.get().is_none());

        let first = capture(10, 10);
        let first_digest = first.fingerprint.clone();
        current.publish(first);
        let snapshot = current.get().expect("first capture published");
        assert_eq!(snapshot.fingerprint, first_digest);

        current.publish(capture(20, 20));
        let latest = current.get().expect("second capture published");
        assert_ne!(latest.fingerprint, first_digest);
        // The old snapshot stays valid for a reader that took it earlier.
        assert_eq!(snapshot.fingerprint, first_digest);
    }
}
