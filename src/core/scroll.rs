//! Scroll position -> target frame
//!
//! Linear and frame-granular: sub-frame scroll offsets truncate, so the
//! animation advances in discrete steps tied to scroll distance.

use log::trace;

/// Host viewport geometry sampled on scroll/resize
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    pub scroll_y: f64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub document_height: f64,
}

impl ViewportMetrics {
    /// Document height minus viewport height
    pub fn scrollable_height(&self) -> f64 {
        self.document_height - self.viewport_height as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollMapper {
    total_frames: usize,
}

impl ScrollMapper {
    pub fn new(total_frames: usize) -> Self {
        Self { total_frames }
    }

    /// Frame for the given geometry, `None` if the geometry is degenerate
    pub fn frame_for(&self, metrics: &ViewportMetrics) -> Option<usize> {
        if self.total_frames == 0 {
            return None;
        }
        let scrollable = metrics.scrollable_height();
        // Also rejects NaN
        if !(scrollable > 0.0) {
            return None;
        }
        let raw = (metrics.scroll_y / scrollable * self.total_frames as f64).floor();
        if !raw.is_finite() {
            return None;
        }
        let last = self.total_frames - 1;
        Some(if raw <= 0.0 { 0 } else { (raw as usize).min(last) })
    }

    /// Write the mapped frame into `target` unless the geometry is degenerate.
    ///
    /// Returns `true` if `target` changed.
    pub fn update(&self, metrics: &ViewportMetrics, target: &mut usize) -> bool {
        let Some(frame) = self.frame_for(metrics) else {
            trace!("Scroll update ignored: {:?}", metrics);
            return false;
        };
        let changed = *target != frame;
        *target = frame;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TOTAL_FRAMES;

    fn metrics(scroll_y: f64, document_height: f64) -> ViewportMetrics {
        ViewportMetrics {
            scroll_y,
            viewport_width: 1280,
            viewport_height: 720,
            document_height,
        }
    }

    #[test]
    fn test_boundaries() {
        let mapper = ScrollMapper::new(TOTAL_FRAMES);
        let doc = 11520.0 + 720.0;
        assert_eq!(mapper.frame_for(&metrics(0.0, doc)), Some(0));
        assert_eq!(mapper.frame_for(&metrics(11520.0, doc)), Some(TOTAL_FRAMES - 1));
        assert_eq!(mapper.frame_for(&metrics(20000.0, doc)), Some(TOTAL_FRAMES - 1));
        assert_eq!(mapper.frame_for(&metrics(-40.0, doc)), Some(0));
    }

    #[test]
    fn test_truncates_sub_frame_offsets() {
        let mapper = ScrollMapper::new(TOTAL_FRAMES);
        let doc = 11520.0 + 720.0; // 10px per frame
        assert_eq!(mapper.frame_for(&metrics(9.99, doc)), Some(0));
        assert_eq!(mapper.frame_for(&metrics(10.0, doc)), Some(1));
        assert_eq!(mapper.frame_for(&metrics(10005.0, doc)), Some(1000));
    }

    #[test]
    fn test_degenerate_geometry_keeps_target() {
        let mapper = ScrollMapper::new(TOTAL_FRAMES);
        let mut target = 42;

        assert!(!mapper.update(&metrics(100.0, 720.0), &mut target));
        assert!(!mapper.update(&metrics(100.0, 500.0), &mut target));
        assert!(!mapper.update(&metrics(f64::NAN, 5000.0), &mut target));
        assert!(!mapper.update(&metrics(100.0, f64::NAN), &mut target));
        assert!(!mapper.update(&metrics(f64::INFINITY, 5000.0), &mut target));
        assert_eq!(target, 42);

        assert!(mapper.update(&metrics(0.0, 5000.0), &mut target));
        assert_eq!(target, 0);
        assert!(!mapper.update(&metrics(0.0, 5000.0), &mut target));
    }
}
