//! Captured frames.
//!
//! - `Frame`: an owned RGB8 image produced by the ingest layer.
//!
//! Frames are mutable so the processor can draw annotations in place. The
//! pixel buffer is always tightly packed RGB (3 bytes per pixel, no row
//! padding); the ingest layer normalizes device formats before a `Frame`
//! is built.

use anyhow::{anyhow, Result};
use image::RgbImage;

/// A single captured RGB frame.
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,

    /// Capture sequence number, starting at 1 for each opened device.
    pub sequence: u64,
}

impl Frame {
    /// Wrap an already-decoded RGB image.
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self { image, sequence }
    }

    /// Build a frame from packed RGB24 bytes.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("RGB buffer does not fit {}x{}", width, height))?;
        Ok(Self::new(image, sequence))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Mutable access for in-place annotation.
    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Packed RGB24 bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgb_validates_length() {
        assert!(Frame::from_rgb(vec![0u8; 11], 2, 2, 1).is_err());

        let frame = Frame::from_rgb(vec![7u8; 12], 2, 2, 1).unwrap();
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.pixels().len(), 12);
        assert_eq!(frame.sequence, 1);
    }

    #[test]
    fn image_mut_writes_through() {
        let mut frame = Frame::from_rgb(vec![0u8; 12], 2, 2, 1).unwrap();
        frame.image_mut().put_pixel(1, 1, image::Rgb([1, 2, 3]));
        assert_eq!(&frame.pixels()[9..12], &[1, 2, 3]);
    }
}
