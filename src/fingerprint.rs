//! Content fingerprints for clipboard images.
//!
//! The poller decides "is this a new screenshot?" by digest comparison, so the
//! digest must depend on pixel content only, never on whatever container or
//! metadata the OS clipboard happened to hand us. We hash a canonical lossless
//! form (dimensions plus RGBA8 bytes) instead of an encoded file so the value
//! cannot drift with encoder settings.

use image::DynamicImage;
use sha2::{Digest, Sha256};

/// Computes the content digest of an image as a hex string.
///
/// Deterministic for byte-identical pixel content: the image is normalized to
/// RGBA8 before hashing, so the same pixels in a different color mode produce
/// the same digest. This is strict pixel equality, not perceptual similarity.
pub fn digest(image: &DynamicImage) -> String {
    let rgba = image.to_rgba8();
    let mut hasher = Sha256::new();
    hasher.update(rgba.width().to_le_bytes());
    hasher.update(rgba.height().to_le_bytes());
    hasher.update(rgba.as_raw());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn solid_rgba(w: u32, h: u32, px: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(px)))
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let img = solid_rgba(100, 100, [10, 20, 30, 255]);
        assert_eq!(digest(&img), digest(&img));
    }

    #[test]
    fn one_pixel_difference_changes_the_digest() {
        let a = solid_rgba(16, 16, [0, 0, 0, 255]);
        let mut buf = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 255]));
        buf.put_pixel(7, 3, Rgba([0, 0, 1, 255]));
        let b = DynamicImage::ImageRgba8(buf);
        assert_ne!(digest(&a), digest(&b));
    }

    #[test]
    fn same_pixels_in_different_modes_agree() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([200, 100, 50])));
        let rgba = solid_rgba(8, 8, [200, 100, 50, 255]);
        assert_eq!(digest(&rgb), digest(&rgba));
    }

    #[test]
    fn dimensions_are_part_of_the_content() {
        // Same byte stream, different shape: 2x8 vs 4x4 of identical pixels.
        let a = solid_rgba(2, 8, [1, 2, 3, 255]);
        let b = solid_rgba(4, 4, [1, 2, 3, 255]);
        assert_ne!(digest(&a), digest(&b));
    }
}
