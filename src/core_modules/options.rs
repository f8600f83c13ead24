// THEORY:
// `AnalysisOptions` is the immutable configuration for one analysis call. It is also
// the wire contract: every field is optional on the wire and falls back to its
// default, unknown fields are ignored, and out-of-range list lengths are clamped
// at use rather than rejected at parse time.

use crate::core_modules::roi::RoiConfig;
use crate::core_modules::top_k::{MAX_RANKED_COLORS, MIN_RANKED_COLORS};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_MOTION_THRESHOLD: f64 = 0.1;
pub const DEFAULT_RANKED_COLORS: i64 = 3;

/// Configuration for one analysis invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisOptions {
    /// Score the full frame against the previous one.
    #[serde(deserialize_with = "null_as_default")]
    pub enable_motion_detection: bool,
    /// Per-pixel gray-level change (as a fraction of 255) and overall score threshold, in [0, 1].
    #[serde(deserialize_with = "threshold_or_default")]
    pub motion_threshold: f64,
    /// Restrict color analysis to this normalized rectangle. Motion always uses the full frame.
    pub roi: Option<RoiConfig>,
    /// Requested length of `top_colors`; clamped to [1, 10].
    #[serde(deserialize_with = "count_from_number")]
    pub max_top_colors: i64,
    /// Requested length of `brightest_colors`; clamped to [1, 10].
    #[serde(deserialize_with = "count_from_number")]
    pub max_brightest_colors: i64,
    /// Attach HSV to every reported color.
    #[serde(deserialize_with = "null_as_default")]
    pub enable_hsv_analysis: bool,
    /// Ignore buckets holding less than this share of scanned pixels; 0 disables.
    #[serde(deserialize_with = "null_as_default")]
    pub min_pixel_threshold: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            enable_motion_detection: false,
            motion_threshold: DEFAULT_MOTION_THRESHOLD,
            roi: None,
            max_top_colors: DEFAULT_RANKED_COLORS,
            max_brightest_colors: DEFAULT_RANKED_COLORS,
            enable_hsv_analysis: false,
            min_pixel_threshold: 0.0,
        }
    }
}

// An explicit `null` on the wire means the same as an absent key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn threshold_or_default<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(DEFAULT_MOTION_THRESHOLD))
}

// The wire format only has "number"; accept 3, 3.0 or -2.7 alike and truncate.
fn count_from_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.map_or(DEFAULT_RANKED_COLORS, |value| value as i64))
}

fn clamp_ranked(requested: i64) -> usize {
    requested.clamp(MIN_RANKED_COLORS as i64, MAX_RANKED_COLORS as i64) as usize
}

impl AnalysisOptions {
    pub fn clamped_top_colors(&self) -> usize {
        clamp_ranked(self.max_top_colors)
    }

    pub fn clamped_brightest_colors(&self) -> usize {
        clamp_ranked(self.max_brightest_colors)
    }

    pub fn threshold_enabled(&self) -> bool {
        self.min_pixel_threshold > 0.0
    }

    /// `total_pixels_analyzed` is only reported when HSV or thresholding is on.
    pub fn reports_pixel_total(&self) -> bool {
        self.enable_hsv_analysis || self.threshold_enabled()
    }

    pub fn with_motion(mut self, threshold: f64) -> Self {
        self.enable_motion_detection = true;
        self.motion_threshold = threshold;
        self
    }

    pub fn with_roi(mut self, roi: RoiConfig) -> Self {
        self.roi = Some(roi);
        self
    }

    pub fn with_color_limits(mut self, top: i64, brightest: i64) -> Self {
        self.max_top_colors = top;
        self.max_brightest_colors = brightest;
        self
    }

    pub fn with_hsv(mut self) -> Self {
        self.enable_hsv_analysis = true;
        self
    }

    pub fn with_min_pixel_threshold(mut self, threshold: f64) -> Self {
        self.min_pixel_threshold = threshold;
        self
    }
}
