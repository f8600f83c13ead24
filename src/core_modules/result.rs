// THEORY:
// `PixelColorsResult` is the report for one analyzed frame. Several keys are
// presence-conditional on the options that produced them, and that presence is part
// of the contract, so each one is an explicit `Option` that is omitted from the wire
// form when absent:
// - `motion`                only when motion detection is enabled
// - `roi_applied`           only when an ROI was supplied (always `true` then)
// - `total_pixels_analyzed` only when HSV analysis or thresholding is enabled

use crate::core_modules::color::ColorInfo;
use serde::{Deserialize, Serialize};

/// Change score of a frame against the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionResult {
    /// Fraction of pixels whose gray level changed by more than the threshold, in [0, 1].
    pub score: f64,
    /// `score > threshold`.
    pub has_motion: bool,
}

impl MotionResult {
    pub const STILL: MotionResult = MotionResult {
        score: 0.0,
        has_motion: false,
    };
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelColorsResult {
    /// Non-empty buckets that survived threshold filtering.
    pub unique_color_count: usize,
    /// Most frequent colors, by pixel count descending.
    pub top_colors: Vec<ColorInfo>,
    /// Brightest colors, by average BT.709 luma descending.
    pub brightest_colors: Vec<ColorInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion: Option<MotionResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi_applied: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pixels_analyzed: Option<u64>,
}

impl PixelColorsResult {
    /// The zero-valued result: no colors, no optional keys.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.unique_color_count == 0 && self.top_colors.is_empty() && self.brightest_colors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_has_only_required_keys() {
        let json = serde_json::to_value(PixelColorsResult::empty()).expect("serializable");
        assert_eq!(
            json,
            serde_json::json!({
                "uniqueColorCount": 0,
                "topColors": [],
                "brightestColors": []
            })
        );
    }

    #[test]
    fn present_optionals_use_wire_names() {
        let result = PixelColorsResult {
            unique_color_count: 1,
            top_colors: vec![ColorInfo::rgb(8, 16, 24)],
            brightest_colors: vec![ColorInfo::rgb(8, 16, 24)],
            motion: Some(MotionResult {
                score: 0.5,
                has_motion: true,
            }),
            roi_applied: Some(true),
            total_pixels_analyzed: Some(64),
        };
        let json = serde_json::to_value(&result).expect("serializable");
        assert_eq!(json["motion"]["hasMotion"], serde_json::json!(true));
        assert_eq!(json["roiApplied"], serde_json::json!(true));
        assert_eq!(json["totalPixelsAnalyzed"], serde_json::json!(64));

        let back: PixelColorsResult = serde_json::from_value(json).expect("deserializable");
        assert_eq!(back, result);
    }
}
