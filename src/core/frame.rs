//! Decoded frames and their cache status
//!
//! **Why**: The cache stores frames in three observable states. Only `Ready`
//! frames carry pixels; `Pending` and `Failed` are never drawn.
//!
//! **Used by**: Frame sources (decode), cache (entries), canvas (blit)

use image::RgbaImage;
use log::debug;
use std::sync::Arc;

/// Frame loading status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Pending, // Load issued, not yet decoded
    Ready,   // Decoded, dimensions known
    Failed,  // Fetch or decode error, never retried
}

impl FrameStatus {
    /// Ready or failed
    pub fn is_settled(self) -> bool {
        !matches!(self, FrameStatus::Pending)
    }
}

/// Frame loading errors
#[derive(Debug, Clone, PartialEq)]
pub enum FrameError {
    Io(String),
    Decode(String),
    Unavailable(String),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Io(e) => write!(f, "I/O error: {}", e),
            FrameError::Decode(e) => write!(f, "Decode error: {}", e),
            FrameError::Unavailable(e) => write!(f, "Frame unavailable: {}", e),
        }
    }
}

impl std::error::Error for FrameError {}

/// Decoded RGBA8 frame. Cheap to clone (shared pixel buffer).
#[derive(Debug, Clone)]
pub struct FrameImage {
    pixels: Arc<RgbaImage>,
}

impl FrameImage {
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    /// Solid-color frame, mostly for tests and placeholders
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::from_rgba(RgbaImage::from_pixel(width, height, image::Rgba(rgba)))
    }

    /// Decode an encoded image (WebP, PNG, ...) into RGBA8
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let img = image::load_from_memory(bytes).map_err(|e| FrameError::Decode(e.to_string()))?;
        let rgba = img.to_rgba8();
        debug!("Decoded frame: {}x{}", rgba.width(), rgba.height());
        Ok(Self::from_rgba(rgba))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Memory size in bytes
    pub fn mem(&self) -> usize {
        self.pixels.as_raw().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Test: PNG bytes decode into RGBA with the right dimensions
    #[test]
    fn test_decode_png() {
        let src = RgbaImage::from_pixel(8, 4, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        src.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let frame = FrameImage::decode(&bytes).unwrap();
        assert_eq!((frame.width(), frame.height()), (8, 4));
        assert_eq!(frame.pixels().get_pixel(3, 2).0, [10, 20, 30, 255]);
        assert_eq!(frame.mem(), 8 * 4 * 4);
    }

    /// Test: garbage bytes are a decode error, not a panic
    #[test]
    fn test_decode_garbage() {
        let err = FrameImage::decode(b"not an image").unwrap_err();
        assert!(matches!(err, FrameError::Decode(_)));
    }

    #[test]
    fn test_status_settled() {
        assert!(!FrameStatus::Pending.is_settled());
        assert!(FrameStatus::Ready.is_settled());
        assert!(FrameStatus::Failed.is_settled());
    }
}
