//! Rolling size statistics used to normalise heatmap intensity.

use crate::engine::timeslot::BookStats;

/// Samples taken with the fast EMA before switching to the slow one.
const WARMUP_SAMPLES: usize = 200;

/// Tracks the typical resting size per price level so the heatmap colour
/// range adapts to the instrument.
#[derive(Debug, Clone)]
pub struct SizeScale {
    /// Rolling EMA of per-level quantity magnitude.
    pub rolling_mean_qty: f64,
    /// Rolling EMA of per-level quantity std deviation.
    pub rolling_std_qty: f64,
    pub samples: usize,
    /// How many standard deviations above the mean map to full intensity.
    pub contrast: f64,
}

impl Default for SizeScale {
    fn default() -> Self {
        Self {
            rolling_mean_qty: 0.0,
            rolling_std_qty: 1.0,
            samples: 0,
            contrast: 4.0,
        }
    }
}

impl SizeScale {
    /// Reset all accumulated state (called on symbol change).
    pub fn reset(&mut self) {
        self.rolling_mean_qty = 0.0;
        self.rolling_std_qty = 1.0;
        self.samples = 0;
    }

    /// Fold one book snapshot into the rolling statistics.
    pub fn update(&mut self, stats: &BookStats) {
        if stats.is_empty() {
            return;
        }
        let levels: Vec<f64> = stats.level_sizes().filter(|&q| q > 0.0).collect();
        if levels.is_empty() {
            return;
        }

        let m = levels.iter().sum::<f64>() / levels.len() as f64;
        let v = levels.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / levels.len() as f64;
        let s = v.sqrt().max(1e-9);

        let alpha = if self.samples < WARMUP_SAMPLES { 0.05 } else { 0.01 };

        if self.samples == 0 {
            self.rolling_mean_qty = m;
            self.rolling_std_qty = s;
        } else {
            self.rolling_mean_qty = self.rolling_mean_qty * (1.0 - alpha) + m * alpha;
            self.rolling_std_qty = self.rolling_std_qty * (1.0 - alpha) + s * alpha;
        }
        self.samples += 1;
    }

    /// Size that maps to full heatmap intensity, once at least one sample
    /// has been seen.
    pub fn max_size(&self) -> Option<f64> {
        if self.samples == 0 {
            return None;
        }
        let max = self.rolling_mean_qty + self.contrast * self.rolling_std_qty;
        (max.is_finite() && max > 0.0).then_some(max)
    }

    /// Full-intensity size for a row that sums `levels_per_row` book levels.
    pub fn max_row_size(&self, levels_per_row: u32) -> Option<f64> {
        self.max_size().map(|max| max * f64::from(levels_per_row.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::timeslot::Timeslot;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn book() -> BookStats {
        let mut s = BookStats::default();
        s.bids.insert(dec!(10), dec!(2));
        s.bids.insert(dec!(9), dec!(4));
        s.asks.insert(dec!(11), dec!(6));
        s.asks.insert(dec!(12), dec!(0));
        s
    }

    #[test]
    fn no_maximum_before_first_sample() {
        let scale = SizeScale::default();
        assert_eq!(scale.max_size(), None);
    }

    #[test]
    fn first_sample_seeds_statistics() {
        let mut scale = SizeScale::default();
        scale.update(&book());
        assert_eq!(scale.rolling_mean_qty, 4.0);
        let std = (8.0f64 / 3.0).sqrt();
        assert!((scale.rolling_std_qty - std).abs() < 1e-12);
        let max = scale.max_size().unwrap();
        assert!((max - (4.0 + 4.0 * std)).abs() < 1e-9);
    }

    #[test]
    fn empty_book_is_ignored() {
        let mut scale = SizeScale::default();
        scale.update(&BookStats::default());
        assert_eq!(scale.samples, 0);
    }

    #[test]
    fn multi_tick_rows_do_not_saturate() {
        let mut book = BookStats::default();
        for i in 0..40i64 {
            let qty = if i % 2 == 0 { dec!(5) } else { dec!(15) };
            book.bids.insert(Decimal::from(1000 - i), qty);
        }
        let mut scale = SizeScale::default();
        scale.update(&book);
        assert!((scale.max_size().unwrap() - 30.0).abs() < 1e-9);

        let from = jiff::Timestamp::from_second(1_700_000_000).unwrap();
        let mut slot = Timeslot::new(from, from + jiff::SignedDuration::from_secs(1)).unwrap();
        slot.set_stats(Arc::new(book));
        slot.generate_rows(10, 1000.0, 4.0);
        slot.refill();
        let row = slot.rows()[0].size;
        assert_eq!(row, 40.0);

        assert!(row / scale.max_size().unwrap() > 1.0);
        let strength = row / scale.max_row_size(4).unwrap();
        assert!((strength - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(scale.max_row_size(0), scale.max_size());
    }

    #[test]
    fn later_samples_move_slowly() {
        let mut scale = SizeScale::default();
        scale.update(&book());
        let mut big = BookStats::default();
        big.bids.insert(dec!(10), dec!(104));
        scale.update(&big);
        assert!((scale.rolling_mean_qty - (4.0 * 0.95 + 104.0 * 0.05)).abs() < 1e-9);
        scale.reset();
        assert_eq!(scale.max_size(), None);
    }
}
