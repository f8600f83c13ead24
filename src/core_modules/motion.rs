// THEORY:
// The motion detector answers one question per frame: how much of the picture
// changed since the previous frame? It is the only stateful analyzer in the engine,
// holding exactly one previous grayscale frame (a sliding window of depth 1).
//
// State machine:
// - **Uninitialized**: no previous frame. The incoming frame becomes the reference
//   and the score is zero.
// - **Tracking**: a previous frame is held. If the new frame has different
//   dimensions it is treated as a new stream (back to the uninitialized behavior);
//   otherwise every pixel whose gray level moved by more than `threshold * 255` is
//   counted, and the score is the changed fraction of the frame.
//
// Motion always looks at the full frame; ROI cropping never applies here.

use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::core_modules::result::MotionResult;
use image::GrayImage;
use log::debug;

/// Rec. 601 grayscale of the whole frame.
pub fn to_grayscale(frame: &PixelBuffer) -> GrayImage {
    let mut gray = GrayImage::new(frame.width(), frame.height());
    for (level, pixel) in gray.iter_mut().zip(frame.pixels()) {
        *level = pixel.grayscale();
    }
    gray
}

/// Frame-differencing motion scorer with a one-frame memory.
#[derive(Debug, Default)]
pub struct MotionDetector {
    previous: Option<GrayImage>,
}

impl MotionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tracking(&self) -> bool {
        self.previous.is_some()
    }

    /// Forgets the reference frame; the next update reports zero motion.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Scores `frame` against the reference and makes it the new reference.
    pub fn update(&mut self, frame: &PixelBuffer, threshold: f64) -> MotionResult {
        let current = to_grayscale(frame);

        let previous = match self.previous.take() {
            Some(previous) if previous.dimensions() == current.dimensions() => previous,
            Some(previous) => {
                debug!(
                    "motion reference reset: {:?} -> {:?}",
                    previous.dimensions(),
                    current.dimensions()
                );
                self.previous = Some(current);
                return MotionResult::STILL;
            }
            None => {
                self.previous = Some(current);
                return MotionResult::STILL;
            }
        };

        let total_pixels = current.len();
        let level_threshold = (threshold * 255.0) as i32;
        let changed = current
            .iter()
            .zip(previous.iter())
            .filter(|&(now, before)| (*now as i32 - *before as i32).abs() > level_threshold)
            .count();

        self.previous = Some(current);

        let score = if total_pixels == 0 {
            0.0
        } else {
            changed as f64 / total_pixels as f64
        };
        MotionResult {
            score,
            has_motion: score > threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::Pixel;

    fn solid(width: u32, height: u32, level: u8) -> PixelBuffer {
        PixelBuffer::filled(width, height, Pixel::opaque(level, level, level))
    }

    #[test]
    fn first_frame_reports_no_motion() {
        let mut detector = MotionDetector::new();
        assert!(!detector.is_tracking());
        assert_eq!(detector.update(&solid(4, 4, 200), 0.1), MotionResult::STILL);
        assert!(detector.is_tracking());
    }

    #[test]
    fn identical_frames_score_zero() {
        let mut detector = MotionDetector::new();
        let frame = solid(8, 8, 90);
        detector.update(&frame, 0.1);
        let result = detector.update(&frame, 0.1);
        assert_eq!(result.score, 0.0);
        assert!(!result.has_motion);
    }

    #[test]
    fn full_change_scores_one() {
        let mut detector = MotionDetector::new();
        detector.update(&solid(8, 8, 0), 0.1);
        let result = detector.update(&solid(8, 8, 255), 0.1);
        assert_eq!(result.score, 1.0);
        assert!(result.has_motion);
    }

    #[test]
    fn partial_change_counts_pixels_past_the_level_threshold() {
        let mut detector = MotionDetector::new();
        detector.update(&solid(10, 1, 100), 0.1);

        // threshold 0.1 -> level 25; a change of exactly 25 is not enough.
        let mut data = Vec::new();
        for x in 0..10u8 {
            let level = match x {
                0..=2 => 150,
                3 => 125,
                _ => 100,
            };
            data.extend_from_slice(&[level, level, level, 255]);
        }
        let result = detector.update(&PixelBuffer::rgba(10, 1, data), 0.1);
        assert!((result.score - 0.3).abs() < 1e-9);
        assert!(result.has_motion);

        // The changed frame is now the reference.
        let settled = PixelBuffer::rgba(10, 1, [150u8, 150, 150, 255].repeat(10));
        let again = detector.update(&settled, 0.1);
        assert!((again.score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn score_at_threshold_is_not_motion() {
        let mut detector = MotionDetector::new();
        detector.update(&solid(10, 1, 0), 0.5);
        let mut data = vec![0u8; 40];
        for pixel in data.chunks_exact_mut(4).take(5) {
            pixel.copy_from_slice(&[255, 255, 255, 255]);
        }
        let result = detector.update(&PixelBuffer::rgba(10, 1, data), 0.5);
        assert_eq!(result.score, 0.5);
        assert!(!result.has_motion);
    }

    #[test]
    fn dimension_change_restarts_tracking() {
        let mut detector = MotionDetector::new();
        detector.update(&solid(4, 4, 0), 0.1);
        assert_eq!(detector.update(&solid(2, 8, 255), 0.1), MotionResult::STILL);
        // Same dimensions again: now compared against the 2x8 frame.
        assert_eq!(detector.update(&solid(2, 8, 255), 0.1).score, 0.0);
    }

    #[test]
    fn reset_forgets_the_reference() {
        let mut detector = MotionDetector::new();
        detector.update(&solid(4, 4, 0), 0.1);
        detector.reset();
        assert_eq!(detector.update(&solid(4, 4, 255), 0.1), MotionResult::STILL);
    }

    #[test]
    fn grayscale_covers_rgb_frames() {
        let frame = PixelBuffer::rgb(2, 1, vec![100, 150, 200, 0, 0, 0]);
        let gray = to_grayscale(&frame);
        assert_eq!(gray.get_pixel(0, 0).0, [140]);
        assert_eq!(gray.get_pixel(1, 0).0, [0]);
    }
}
