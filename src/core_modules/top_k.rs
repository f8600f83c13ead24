// THEORY:
// The top-K selector turns a finished histogram into the two short lists the report
// needs: the most frequent colors and the brightest colors. Both lists are bounded
// insertion sorts over the same scan of the bucket domain.
//
// Ordering contract:
// - A new entry is placed after every existing entry whose key is greater than or
//   equal to its own. Since buckets arrive in ascending index order, ties keep
//   ascending bucket order (first seen wins).
// - An insertion position at or past the capacity is discarded; when an insertion
//   pushes the list over capacity the tail is dropped.
// With K <= 10 and a fixed bucket domain the O(BUCKETS * K) worst case is bounded.

use crate::core_modules::histogram::{BucketStat, ColorHistogram};

/// Hard bounds for the configurable list lengths.
pub const MIN_RANKED_COLORS: usize = 1;
pub const MAX_RANKED_COLORS: usize = 10;

/// A descending, capacity-bounded list with stable ties.
#[derive(Debug, Clone)]
pub struct BoundedRanking<T> {
    capacity: usize,
    entries: Vec<(u64, T)>,
}

impl<T> BoundedRanking<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity + 1),
        }
    }

    /// Offers `item` ranked by `key`. Returns whether it made the list.
    pub fn offer(&mut self, key: u64, item: T) -> bool {
        let position = self
            .entries
            .iter()
            .position(|(existing, _)| key > *existing)
            .unwrap_or(self.entries.len());
        if position >= self.capacity {
            return false;
        }
        self.entries.insert(position, (key, item));
        self.entries.truncate(self.capacity);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().map(|(key, _)| *key)
    }

    pub fn into_items(self) -> Vec<T> {
        self.entries.into_iter().map(|(_, item)| item).collect()
    }
}

/// What survives thresholding, plus both rankings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorSelection {
    pub unique_color_count: usize,
    pub top_colors: Vec<BucketStat>,
    pub brightest_colors: Vec<BucketStat>,
}

/// Scans every bucket once and fills both rankings.
///
/// A bucket is ignored entirely (not counted, not ranked) when thresholding is on and
/// its count is below `trunc(total_pixels * min_pixel_threshold)`.
pub fn select_colors(
    histogram: &ColorHistogram,
    max_top_colors: usize,
    max_brightest_colors: usize,
    min_pixel_threshold: f64,
) -> ColorSelection {
    let threshold_count = if min_pixel_threshold > 0.0 {
        Some((histogram.total_pixels() as f64 * min_pixel_threshold) as u64)
    } else {
        None
    };

    let mut top = BoundedRanking::new(max_top_colors);
    let mut brightest = BoundedRanking::new(max_brightest_colors);
    let mut unique_color_count = 0;

    for stat in histogram.occupied() {
        if threshold_count.is_some_and(|minimum| (stat.count as u64) < minimum) {
            continue;
        }
        unique_color_count += 1;
        top.offer(stat.count as u64, stat);
        brightest.offer(stat.average_brightness, stat);
    }

    ColorSelection {
        unique_color_count,
        top_colors: top.into_items(),
        brightest_colors: brightest.into_items(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::Pixel;

    fn repeat(pixel: Pixel, count: usize) -> impl Iterator<Item = Pixel> {
        std::iter::repeat_n(pixel, count)
    }

    #[test]
    fn ranking_keeps_descending_order_with_stable_ties() {
        let mut ranking = BoundedRanking::new(3);
        assert!(ranking.offer(5, "a"));
        assert!(ranking.offer(7, "b"));
        assert!(ranking.offer(5, "c"));
        // Full; a tie with the tail lands past capacity and is discarded.
        assert!(!ranking.offer(5, "d"));
        // Beats the tail; the old tail falls off.
        assert!(ranking.offer(6, "e"));
        assert_eq!(ranking.keys().collect::<Vec<_>>(), vec![7, 6, 5]);
        assert_eq!(ranking.into_items(), vec!["b", "e", "a"]);
    }

    #[test]
    fn ranking_never_exceeds_capacity() {
        let mut ranking = BoundedRanking::new(2);
        for key in 0..50u64 {
            ranking.offer(key, key);
            assert!(ranking.len() <= 2);
        }
        assert_eq!(ranking.into_items(), vec![49, 48]);
    }

    #[test]
    fn half_white_half_black_ties_in_bucket_order() {
        let white = Pixel::opaque(255, 255, 255);
        let black = Pixel::opaque(0, 0, 0);
        let histogram = ColorHistogram::from_pixels(repeat(white, 32).chain(repeat(black, 32)));

        let selection = select_colors(&histogram, 2, 2, 0.0);
        assert_eq!(selection.unique_color_count, 2);
        let top: Vec<usize> = selection.top_colors.iter().map(|s| s.index).collect();
        assert_eq!(top, vec![black.bucket_index(), white.bucket_index()]);
        let bright: Vec<usize> = selection.brightest_colors.iter().map(|s| s.index).collect();
        assert_eq!(bright, vec![white.bucket_index(), black.bucket_index()]);
    }

    #[test]
    fn threshold_drops_small_buckets_from_everything() {
        let histogram = ColorHistogram::from_pixels(
            repeat(Pixel::opaque(200, 0, 0), 60)
                .chain(repeat(Pixel::opaque(0, 200, 0), 30))
                .chain(repeat(Pixel::opaque(0, 0, 200), 10)),
        );

        let selection = select_colors(&histogram, 3, 3, 0.5);
        assert_eq!(selection.unique_color_count, 1);
        assert_eq!(selection.top_colors.len(), 1);
        assert_eq!(selection.top_colors[0].count, 60);
        assert_eq!(selection.brightest_colors.len(), 1);

        let unfiltered = select_colors(&histogram, 3, 3, 0.0);
        assert_eq!(unfiltered.unique_color_count, 3);
        let counts: Vec<u32> = unfiltered.top_colors.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![60, 30, 10]);
    }

    #[test]
    fn list_lengths_are_independent() {
        let pixels = (0..8u8).map(|level| Pixel::opaque(level * 32, 0, 0));
        let histogram = ColorHistogram::from_pixels(pixels);

        let selection = select_colors(&histogram, 1, 5, 0.0);
        assert_eq!(selection.unique_color_count, 8);
        assert_eq!(selection.top_colors.len(), 1);
        assert_eq!(selection.brightest_colors.len(), 5);
        let brightness: Vec<u64> = selection
            .brightest_colors
            .iter()
            .map(|s| s.average_brightness)
            .collect();
        assert!(brightness.windows(2).all(|pair| pair[0] >= pair[1]));
    }
}
