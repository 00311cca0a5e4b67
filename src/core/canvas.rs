//! Canvas draw: center-cropped "cover" blit with redraw suppression
//!
//! The image is cropped to the canvas aspect ratio around its center and the
//! crop is scaled to fill the whole canvas (no letterboxing). A draw is skipped
//! when there is no surface, the frame is not ready, or the frame is already on
//! screen. Resizing forgets the last drawn frame so the next draw always runs.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::path::Path;

use super::cache::FrameCache;
use super::frame::{FrameError, FrameImage};

/// Source region of an image, in image pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// 2D render target sized to the viewport
pub trait Surface {
    /// Current size in device pixels
    fn size(&self) -> (u32, u32);

    fn resize(&mut self, width: u32, height: u32);

    fn clear(&mut self);

    /// Scale `src` of `image` to cover the whole surface
    fn draw_image(&mut self, image: &FrameImage, src: SourceRect);
}

/// Crop rectangle that preserves the canvas aspect ratio, centered.
///
/// If the image is relatively wider than the canvas its width is cropped,
/// otherwise its height is.
pub fn cover_crop(image_w: u32, image_h: u32, canvas_w: u32, canvas_h: u32) -> SourceRect {
    let (iw, ih) = (image_w as f64, image_h as f64);
    let canvas_aspect = canvas_w as f64 / canvas_h as f64;
    let image_aspect = iw / ih;

    if image_aspect > canvas_aspect {
        let width = ih * canvas_aspect;
        SourceRect { x: (iw - width) / 2.0, y: 0.0, width, height: ih }
    } else {
        let height = iw / canvas_aspect;
        SourceRect { x: 0.0, y: (ih - height) / 2.0, width: iw, height }
    }
}

/// Surface plus the "last drawn frame" sentinel
#[derive(Debug)]
pub struct FrameCanvas<S> {
    surface: Option<S>,
    last_drawn: Option<usize>,
}

impl<S> Default for FrameCanvas<S> {
    fn default() -> Self {
        Self {
            surface: None,
            last_drawn: None,
        }
    }
}

impl<S: Surface> FrameCanvas<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a surface, returning the previous one. Forces the next draw.
    pub fn attach(&mut self, surface: S) -> Option<S> {
        self.last_drawn = None;
        self.surface.replace(surface)
    }

    pub fn detach(&mut self) -> Option<S> {
        self.last_drawn = None;
        self.surface.take()
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    /// Match the surface to the viewport and force a redraw
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(width, height);
        }
        self.last_drawn = None;
    }

    pub fn last_drawn(&self) -> Option<usize> {
        self.last_drawn
    }

    /// Draw `frame` if it differs from what is on screen and is ready.
    ///
    /// Returns `true` if the surface was repainted.
    pub fn draw(&mut self, frame: usize, cache: &FrameCache) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        if self.last_drawn == Some(frame) {
            return false;
        }
        let Some(image) = cache.get(frame) else {
            return false;
        };
        let (canvas_w, canvas_h) = surface.size();
        if canvas_w == 0 || canvas_h == 0 || image.width() == 0 || image.height() == 0 {
            return false;
        }

        let src = cover_crop(image.width(), image.height(), canvas_w, canvas_h);
        surface.clear();
        surface.draw_image(image, src);
        self.last_drawn = Some(frame);
        true
    }
}

/// In-memory RGBA surface
#[derive(Debug, Clone)]
pub struct PixelSurface {
    buffer: RgbaImage,
    filter: FilterType,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: RgbaImage::new(width, height),
            filter: FilterType::Triangle,
        }
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    pub fn buffer(&self) -> &RgbaImage {
        &self.buffer
    }

    pub fn save_png(&self, path: &Path) -> Result<(), FrameError> {
        self.buffer
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| FrameError::Io(format!("{}: {}", path.display(), e)))
    }
}

impl Surface for PixelSurface {
    fn size(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.buffer.dimensions() != (width, height) {
            self.buffer = RgbaImage::new(width, height);
        }
    }

    fn clear(&mut self) {
        for px in self.buffer.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
    }

    fn draw_image(&mut self, image: &FrameImage, src: SourceRect) {
        let (width, height) = self.buffer.dimensions();
        if width == 0 || height == 0 {
            return;
        }
        let (iw, ih) = (image.width(), image.height());
        if iw == 0 || ih == 0 {
            return;
        }
        let x = (src.x.round().max(0.0) as u32).min(iw.saturating_sub(1));
        let y = (src.y.round().max(0.0) as u32).min(ih.saturating_sub(1));
        let w = (src.width.round() as u32).clamp(1, iw - x);
        let h = (src.height.round() as u32).clamp(1, ih - y);

        let cropped = imageops::crop_imm(image.pixels(), x, y, w, h).to_image();
        self.buffer = imageops::resize(&cropped, width, height, self.filter);
    }
}
