// THEORY (1D Pixel Heuristics):
// The `Pixel` module is the most fundamental unit of the analysis engine. It is a
// "dumb" data container for a single 8-bit RGBA pixel plus the handful of
// single-pixel heuristics the rest of the engine needs. Nothing in here knows about
// neighbors, regions or previous frames; anything that compares pixels lives in
// higher modules (`histogram`, `motion`).
//
// Heuristic families (all single-pixel):
// - Quantization: the 5-bit-per-channel bucket a pixel falls into.
// - Brightness:   integer BT.709 luma (histogram ranking) and Rec. 601 luminance
//                 (grayscale for motion scoring).
// - HSV:          hue angle, saturation and value on normalized sRGB channels.
//
// Key principles:
// 1) Single-pixel scope: heuristics never read neighbors or history.
// 2) Integer where the result feeds a histogram, float where it feeds a report.
// 3) Alpha is carried but never consulted by any heuristic.

use serde::{Deserialize, Serialize};

pub type Channel = u8;
pub type NormalizedChannel = f64;
pub type Hue = f64;
pub type Luminance = f64;
pub type Brightness = u32;
pub type BucketIndex = usize;

/// Bits kept per channel when a pixel is quantized into a histogram bucket.
pub const CHANNEL_BITS: u32 = 5;
/// Levels per channel after quantization (32).
pub const LEVELS_PER_CHANNEL: usize = 1 << CHANNEL_BITS;
/// Total number of histogram buckets (32 * 32 * 32).
pub const BUCKETS: usize = LEVELS_PER_CHANNEL * LEVELS_PER_CHANNEL * LEVELS_PER_CHANNEL;

const QUANTIZE_SHIFT: u32 = 8 - CHANNEL_BITS;
const LEVEL_MASK: usize = LEVELS_PER_CHANNEL - 1;

// BT.709 luma weights scaled by 10,000 so the hot path stays in integers.
const LUMA_RED: u32 = 2126;
const LUMA_GREEN: u32 = 7152;
const LUMA_BLUE: u32 = 722;
const LUMA_SCALE: u32 = 10_000;

/// A "dumb" data container representing a single RGBA pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pixel {
    /// The red channel value (0-255).
    pub red: Channel,
    /// The green channel value (0-255).
    pub green: Channel,
    /// The blue channel value (0-255).
    pub blue: Channel,
    /// The alpha (transparency) channel value (0-255).
    pub alpha: Channel,
}

/// Hue in degrees [0, 360), saturation and value scaled to [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HsvColor {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

impl Pixel {
    pub const fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// An opaque pixel, used when the source has no alpha channel.
    pub const fn opaque(red: Channel, green: Channel, blue: Channel) -> Self {
        Self::new(red, green, blue, u8::MAX)
    }

    /// The floor representative of a histogram bucket: each channel is the bucket
    /// level shifted back up, so always a multiple of 8 in [0, 248].
    pub const fn from_bucket(index: BucketIndex) -> Self {
        let red = ((index >> (2 * CHANNEL_BITS)) & LEVEL_MASK) << QUANTIZE_SHIFT;
        let green = ((index >> CHANNEL_BITS) & LEVEL_MASK) << QUANTIZE_SHIFT;
        let blue = (index & LEVEL_MASK) << QUANTIZE_SHIFT;
        Self::opaque(red as Channel, green as Channel, blue as Channel)
    }

    /// =================================Heuristics==================================

    /// Histogram bucket for this pixel: `(R>>3)<<10 | (G>>3)<<5 | (B>>3)`.
    #[inline]
    pub const fn bucket_index(&self) -> BucketIndex {
        let red = (self.red >> QUANTIZE_SHIFT) as usize;
        let green = (self.green >> QUANTIZE_SHIFT) as usize;
        let blue = (self.blue >> QUANTIZE_SHIFT) as usize;
        (red << (2 * CHANNEL_BITS)) | (green << CHANNEL_BITS) | blue
    }

    /// Integer BT.709 luma in [0, 255], truncated.
    ///
    /// - Used to rank histogram buckets by average brightness.
    /// - Stays in integer math so a full-frame scan never touches floats.
    #[inline]
    pub const fn brightness(&self) -> Brightness {
        (LUMA_RED * self.red as u32 + LUMA_GREEN * self.green as u32 + LUMA_BLUE * self.blue as u32)
            / LUMA_SCALE
    }

    /// Luminance estimate (Rec. 601 luma).
    ///
    /// - Interprets perceived brightness as a weighted sum of RGB.
    /// - Feeds the grayscale conversion used for motion scoring.
    pub fn luminance(&self) -> Luminance {
        0.299_f64 * self.red as f64 + 0.587_f64 * self.green as f64 + 0.114_f64 * self.blue as f64
    }

    /// Rec. 601 luminance truncated to a gray level.
    #[inline]
    pub fn grayscale(&self) -> Channel {
        self.luminance() as Channel
    }

    fn normalized(&self) -> (NormalizedChannel, NormalizedChannel, NormalizedChannel) {
        (
            self.red as NormalizedChannel / 255.0,
            self.green as NormalizedChannel / 255.0,
            self.blue as NormalizedChannel / 255.0,
        )
    }

    /// Hue angle in degrees [0, 360) on normalized sRGB channels.
    ///
    /// - Grays (zero chroma) report a hue of 0.
    pub fn hue(&self) -> Hue {
        let (red, green, blue) = self.normalized();
        let maximum_channel = red.max(green.max(blue));
        let minimum_channel = red.min(green.min(blue));
        let chroma = maximum_channel - minimum_channel;

        if chroma <= 1e-9 {
            return 0.0;
        }

        let (base_difference, sector_offset) = if maximum_channel == red {
            (green - blue, 0.0)
        } else if maximum_channel == green {
            (blue - red, 2.0)
        } else {
            (red - green, 4.0)
        };

        let mut hue_degrees = (base_difference / chroma + sector_offset) * 60.0;
        if hue_degrees < 0.0 {
            hue_degrees += 360.0;
        }
        if hue_degrees >= 360.0 {
            hue_degrees -= 360.0;
        }
        hue_degrees
    }

    /// HSV Value (V): brightness defined as max(R, G, B), in [0, 1].
    pub fn value_hsv(&self) -> NormalizedChannel {
        let (red, green, blue) = self.normalized();
        red.max(green.max(blue))
    }

    /// Saturation (HSV): S = chroma / value, in [0, 1].
    /// - Drops to zero for black, even though the hue is undefined there.
    pub fn saturation_hsv(&self) -> NormalizedChannel {
        let (red, green, blue) = self.normalized();
        let maximum_channel = red.max(green.max(blue));
        if maximum_channel <= 1e-9 {
            return 0.0;
        }
        (maximum_channel - red.min(green.min(blue))) / maximum_channel
    }

    /// Full HSV triple in report units (degrees, percent, percent).
    pub fn to_hsv(&self) -> HsvColor {
        HsvColor {
            h: self.hue(),
            s: self.saturation_hsv() * 100.0,
            v: self.value_hsv() * 100.0,
        }
    }
}

impl From<[Channel; 4]> for Pixel {
    fn from(bytes: [Channel; 4]) -> Self {
        Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3])
    }
}

impl From<[Channel; 3]> for Pixel {
    fn from(bytes: [Channel; 3]) -> Self {
        Pixel::opaque(bytes[0], bytes[1], bytes[2])
    }
}
