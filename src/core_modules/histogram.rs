// THEORY:
// The histogram engine is the single linear pass over a frame. Each pixel is
// quantized into one of `BUCKETS` fixed color cells (5 bits per channel) and two
// running totals are kept per cell: how many pixels landed there, and the sum of
// their integer BT.709 brightness.
//
// Key architectural principles:
// 1.  **Request scoped**: a histogram is built fresh for every analysis and dropped
//     with it. It is never reused across frames, so concurrent one-shot calls never
//     share scratch space and nothing leaks from one frame into the next.
// 2.  **Fixed domain**: buckets are addressed by index, not discovered. Readers scan
//     the whole domain in index order, which is what makes every downstream ordering
//     deterministic.
// 3.  **Integer only**: quantization and brightness are shifts, multiplies and one
//     division; the per-pixel path never touches floating point.

use crate::core_modules::pixel::{BUCKETS, BucketIndex, Pixel};

/// Snapshot of one non-empty bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketStat {
    pub index: BucketIndex,
    pub count: u32,
    /// `brightness_sum / count`, truncated.
    pub average_brightness: u64,
}

/// Per-bucket pixel counts and brightness sums for one frame.
pub struct ColorHistogram {
    counts: Box<[u32]>,
    brightness_sums: Box<[u64]>,
    total_pixels: u64,
}

impl Default for ColorHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorHistogram {
    /// A zeroed histogram.
    pub fn new() -> Self {
        Self {
            counts: vec![0u32; BUCKETS].into_boxed_slice(),
            brightness_sums: vec![0u64; BUCKETS].into_boxed_slice(),
            total_pixels: 0,
        }
    }

    /// Builds a histogram from a pixel stream in one pass.
    pub fn from_pixels<I>(pixels: I) -> Self
    where
        I: IntoIterator<Item = Pixel>,
    {
        let mut histogram = Self::new();
        for pixel in pixels {
            histogram.accumulate(pixel);
        }
        histogram
    }

    #[inline]
    pub fn accumulate(&mut self, pixel: Pixel) {
        let index = pixel.bucket_index();
        // A u32 bucket holds 4G pixels; past that it saturates rather than wrapping.
        self.counts[index] = self.counts[index].saturating_add(1);
        self.brightness_sums[index] += pixel.brightness() as u64;
        self.total_pixels += 1;
    }

    pub fn brightness_sum(&self, index: BucketIndex) -> u64 {
        self.brightness_sums[index]
    }

    /// Number of pixels scanned into this histogram.
    pub fn total_pixels(&self) -> u64 {
        self.total_pixels
    }

    /// Statistics for `index`, or `None` when no pixel landed there.
    pub fn bucket(&self, index: BucketIndex) -> Option<BucketStat> {
        let count = self.counts[index];
        if count == 0 {
            return None;
        }
        Some(BucketStat {
            index,
            count,
            average_brightness: self.brightness_sums[index] / count as u64,
        })
    }

    /// Every non-empty bucket, in ascending index order.
    pub fn occupied(&self) -> impl Iterator<Item = BucketStat> + '_ {
        (0..BUCKETS).filter_map(move |index| self.bucket(index))
    }
}
