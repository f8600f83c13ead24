// THEORY:
// The ROI resolver maps a normalized region of interest (0..1 coordinates relative
// to the frame) onto integer pixel bounds. Callers send these rectangles from UI
// code, so they are not trusted: coordinates may be negative, larger than 1, or NaN.
//
// Resolution rules:
// 1.  Origin is `trunc(x * W), trunc(y * H)`, clamped into the frame on both sides.
// 2.  Size is `max(1, trunc(w * W)) x max(1, trunc(h * H))`.
// 3.  The far edge is clamped to the frame.
// The result is always at least 1x1 and fully inside the frame, so the histogram
// pass always has pixels to scan.

use serde::{Deserialize, Serialize};

/// A normalized rectangle. Absent fields default to the whole frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

/// Integer pixel bounds, half-open: `[left, right) x [top, bottom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelRect {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }
}

// Float-to-int `as` casts saturate and send NaN to zero, which is exactly the
// clamping wanted for untrusted fractions.
fn scale(fraction: f64, extent: u32) -> u32 {
    (fraction * extent as f64) as u32
}

impl RoiConfig {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Resolves against a `frame_width` x `frame_height` frame.
    pub fn resolve(&self, frame_width: u32, frame_height: u32) -> PixelRect {
        let left = scale(self.x, frame_width).min(frame_width.saturating_sub(1));
        let top = scale(self.y, frame_height).min(frame_height.saturating_sub(1));
        let width = scale(self.width, frame_width).max(1);
        let height = scale(self.height, frame_height).max(1);

        PixelRect {
            left,
            top,
            right: left.saturating_add(width).min(frame_width),
            bottom: top.saturating_add(height).min(frame_height),
        }
    }
}
