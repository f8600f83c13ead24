// THEORY:
// The color decoder is the last step before a report: it turns a ranked bucket back
// into something a caller can display. The RGB it reports is the bucket's floor
// representative, never an original pixel value, so two frames with slightly
// different shades of the same bucket report identical colors.
//
// Optional enrichments are attached only when the caller asked for them:
// - `hsv` when HSV analysis is enabled.
// - `pixel_percentage` (share of scanned pixels) when thresholding is enabled.

use crate::core_modules::histogram::BucketStat;
use crate::core_modules::pixel::{HsvColor, Pixel};
use serde::{Deserialize, Serialize};

/// A decoded histogram bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorInfo {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hsv: Option<HsvColor>,
    /// Fraction of scanned pixels in this bucket, in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_percentage: Option<f64>,
}

impl ColorInfo {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r,
            g,
            b,
            hsv: None,
            pixel_percentage: None,
        }
    }
}

/// Decodes ranked buckets with a fixed set of enrichments.
#[derive(Debug, Clone, Copy)]
pub struct ColorDecoder {
    with_hsv: bool,
    /// Total scanned pixels when percentages are wanted.
    share_of: Option<u64>,
}

impl ColorDecoder {
    pub fn new(with_hsv: bool, with_percentage: bool, total_pixels: u64) -> Self {
        Self {
            with_hsv,
            share_of: (with_percentage && total_pixels > 0).then_some(total_pixels),
        }
    }

    pub fn decode(&self, stat: &BucketStat) -> ColorInfo {
        let representative = Pixel::from_bucket(stat.index);
        ColorInfo {
            r: representative.red,
            g: representative.green,
            b: representative.blue,
            hsv: self.with_hsv.then(|| representative.to_hsv()),
            pixel_percentage: self
                .share_of
                .map(|total| stat.count as f64 / total as f64),
        }
    }

    pub fn decode_all(&self, stats: &[BucketStat]) -> Vec<ColorInfo> {
        stats.iter().map(|stat| self.decode(stat)).collect()
    }
}
