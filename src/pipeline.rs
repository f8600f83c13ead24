// THEORY:
// The `pipeline` module is the synchronous, top-level API of the analysis engine.
// It wires the leaf analyzers into one pass over a frame:
//
//   validate -> (ROI resolve) -> histogram -> top-K -> decode -> (motion) -> result
//
// `PixelAnalyzer` is the per-session engine object. Everything that lives longer
// than one call is owned here, explicitly, instead of in process-wide globals. The
// only such state is the motion detector's reference frame, guarded by its own
// lock so a streaming update and a concurrent one-shot call can never interleave
// inside a motion comparison. Histograms stay request-scoped, which keeps the
// color half of the pipeline fully reentrant.

use crate::core_modules::color::ColorDecoder;
use crate::core_modules::histogram::ColorHistogram;
use crate::core_modules::motion::MotionDetector;
use crate::core_modules::top_k::select_colors;
use crate::error::Result;
use log::warn;
use std::sync::{Mutex, PoisonError};

// Re-export key data structures for the public API.
pub use crate::core_modules::color::ColorInfo;
pub use crate::core_modules::options::AnalysisOptions;
pub use crate::core_modules::pixel::HsvColor;
pub use crate::core_modules::pixel_buffer::{PixelBuffer, PixelFormat};
pub use crate::core_modules::result::{MotionResult, PixelColorsResult};
pub use crate::core_modules::roi::{PixelRect, RoiConfig};

/// Long edge, in pixels, that the adapter downscales oversized frames to.
pub const DEFAULT_MAX_WORKING_DIMENSION: u32 = 1920;
const DEFAULT_QUEUE_CAPACITY: usize = 4;

/// What the streaming queue does with a frame that arrives while it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverloadPolicy {
    /// Evict the oldest queued frame; the newest frame always gets analyzed.
    #[default]
    DropOldest,
    /// Refuse the incoming frame and keep the queue as it is.
    RejectNewest,
}

/// Configuration for one analysis session.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// How many submitted frames may wait for the streaming worker. At least 1.
    pub queue_capacity: usize,
    /// What to do when a frame arrives and the queue is already full.
    pub overload_policy: OverloadPolicy,
    /// Frames whose long edge exceeds this are downscaled by the adapter before
    /// analysis (`StreamingPipeline::submit_native`, the CLI loader).
    pub max_working_dimension: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overload_policy: OverloadPolicy::default(),
            max_working_dimension: DEFAULT_MAX_WORKING_DIMENSION,
        }
    }
}

/// The analysis engine for one camera session.
#[derive(Debug, Default)]
pub struct PixelAnalyzer {
    motion: Mutex<MotionDetector>,
}

impl PixelAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the full pipeline. A malformed buffer is logged and reported as the
    /// empty result, so a continuous stream survives a bad frame.
    pub fn analyze(&self, buffer: &PixelBuffer, options: &AnalysisOptions) -> PixelColorsResult {
        match self.try_analyze(buffer, options) {
            Ok(result) => result,
            Err(err) => {
                warn!("frame skipped, reporting empty result: {err}");
                PixelColorsResult::empty()
            }
        }
    }

    /// Runs the full pipeline, surfacing input errors instead of degrading.
    pub fn try_analyze(&self, buffer: &PixelBuffer, options: &AnalysisOptions) -> Result<PixelColorsResult> {
        buffer.validate()?;

        // Stage 1: Region Resolution
        let region = match &options.roi {
            Some(roi) => roi.resolve(buffer.width(), buffer.height()),
            None => buffer.full_rect(),
        };

        // Stage 2: Histogram Pass
        let histogram = ColorHistogram::from_pixels(buffer.region_pixels(region));

        // Stage 3: Ranking
        let selection = select_colors(
            &histogram,
            options.clamped_top_colors(),
            options.clamped_brightest_colors(),
            options.min_pixel_threshold,
        );

        // Stage 4: Decoding
        let total_pixels = histogram.total_pixels();
        let decoder = ColorDecoder::new(
            options.enable_hsv_analysis,
            options.threshold_enabled(),
            total_pixels,
        );

        let mut result = PixelColorsResult {
            unique_color_count: selection.unique_color_count,
            top_colors: decoder.decode_all(&selection.top_colors),
            brightest_colors: decoder.decode_all(&selection.brightest_colors),
            motion: None,
            roi_applied: options.roi.map(|_| true),
            total_pixels_analyzed: options.reports_pixel_total().then_some(total_pixels),
        };

        // Stage 5: Motion, always over the unrestricted frame
        if options.enable_motion_detection {
            let mut detector = self.motion.lock().unwrap_or_else(PoisonError::into_inner);
            result.motion = Some(detector.update(buffer, options.motion_threshold));
        }

        Ok(result)
    }

    /// Drops the motion reference frame, as if a new stream had started.
    pub fn reset_motion(&self) {
        self.motion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::Pixel;
    use crate::error::AnalysisError;

    fn solid(width: u32, height: u32, pixel: Pixel) -> PixelBuffer {
        PixelBuffer::filled(width, height, pixel)
    }

    #[test]
    fn solid_red_frame() {
        let analyzer = PixelAnalyzer::new();
        let result = analyzer.analyze(
            &solid(8, 8, Pixel::new(255, 0, 0, 255)),
            &AnalysisOptions::default(),
        );

        assert_eq!(result.unique_color_count, 1);
        assert_eq!(result.top_colors, vec![ColorInfo::rgb(248, 0, 0)]);
        assert_eq!(result.brightest_colors, result.top_colors);
        assert!(result.motion.is_none());
        assert!(result.roi_applied.is_none());
        assert!(result.total_pixels_analyzed.is_none());
    }

    #[test]
    fn invalid_buffer_degrades_to_empty_result() {
        let analyzer = PixelAnalyzer::new();
        let broken = PixelBuffer::rgba(4, 4, vec![0; 10]);
        let options = AnalysisOptions::default().with_motion(0.1).with_hsv();

        assert_eq!(analyzer.analyze(&broken, &options), PixelColorsResult::empty());
        assert!(matches!(
            analyzer.try_analyze(&broken, &options),
            Err(AnalysisError::InvalidInput { .. })
        ));
    }

    #[test]
    fn roi_restricts_colors_but_not_motion() {
        // Left half black, right half white.
        let mut data = Vec::new();
        for _row in 0..4 {
            for column in 0..4 {
                let level = if column < 2 { 0 } else { 255 };
                data.extend_from_slice(&[level, level, level, 255]);
            }
        }
        let frame = PixelBuffer::rgba(4, 4, data);
        let analyzer = PixelAnalyzer::new();
        let options = AnalysisOptions::default()
            .with_roi(RoiConfig::new(0.5, 0.0, 0.5, 1.0))
            .with_motion(0.1);

        let first = analyzer.analyze(&frame, &options);
        assert_eq!(first.unique_color_count, 1);
        assert_eq!(first.top_colors, vec![ColorInfo::rgb(248, 248, 248)]);
        assert_eq!(first.roi_applied, Some(true));
        assert_eq!(first.motion, Some(MotionResult::STILL));

        // Change only the left half: outside the ROI, inside the motion frame.
        let changed = solid(4, 4, Pixel::opaque(255, 255, 255));
        let second = analyzer.analyze(&changed, &options);
        assert_eq!(second.unique_color_count, 1);
        let motion = second.motion.expect("motion requested");
        assert_eq!(motion.score, 0.5);
        assert!(motion.has_motion);
    }

    #[test]
    fn pixel_total_and_percentages_follow_options() {
        let analyzer = PixelAnalyzer::new();
        let frame = solid(5, 4, Pixel::opaque(0, 0, 255));

        let hsv = analyzer.analyze(&frame, &AnalysisOptions::default().with_hsv());
        assert_eq!(hsv.total_pixels_analyzed, Some(20));
        assert!(hsv.top_colors[0].hsv.is_some());
        assert!(hsv.top_colors[0].pixel_percentage.is_none());

        let threshold = analyzer.analyze(
            &frame,
            &AnalysisOptions::default().with_min_pixel_threshold(0.01),
        );
        assert_eq!(threshold.total_pixels_analyzed, Some(20));
        assert_eq!(threshold.top_colors[0].pixel_percentage, Some(1.0));
        assert_eq!(threshold.brightest_colors[0].pixel_percentage, Some(1.0));
        assert!(threshold.top_colors[0].hsv.is_none());
    }

    #[test]
    fn reset_motion_restarts_the_stream() {
        let analyzer = PixelAnalyzer::new();
        let options = AnalysisOptions::default().with_motion(0.1);
        analyzer.analyze(&solid(4, 4, Pixel::opaque(0, 0, 0)), &options);
        analyzer.reset_motion();
        let result = analyzer.analyze(&solid(4, 4, Pixel::opaque(255, 255, 255)), &options);
        assert_eq!(result.motion, Some(MotionResult::STILL));
    }
}
