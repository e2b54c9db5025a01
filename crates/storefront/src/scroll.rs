//! Scroll-position heuristic.

use serde::{Deserialize, Serialize};

/// Geometry of the scrollable listing, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub viewport_height: f64,
    pub content_height: f64,
}

impl ScrollMetrics {
    pub fn distance_to_bottom(&self) -> f64 {
        (self.content_height - (self.scroll_top + self.viewport_height)).max(0.0)
    }

    /// Whether the viewport is within `threshold_px` of the end of the content.
    pub fn near_bottom(&self, threshold_px: u32) -> bool {
        self.distance_to_bottom() < f64::from(threshold_px)
    }
}
