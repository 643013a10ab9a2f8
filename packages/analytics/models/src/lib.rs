#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-bucket price statistics and choropleth normalization ranges.

use price_map_geography_models::GeoLevel;
use serde::{Deserialize, Serialize};

/// Median, mean, and count of one price bucket.
///
/// An empty bucket has no median or mean; both serialize as `null` rather
/// than zero so they never drag a color scale down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    /// Middle price, or the mean of the two middle prices.
    pub median_price: Option<f64>,
    /// Arithmetic mean.
    pub mean_price: Option<f64>,
    /// Number of prices in the bucket.
    pub sales: usize,
}

impl PriceStats {
    /// Statistics of an empty bucket.
    pub const EMPTY: Self = Self {
        median_price: None,
        mean_price: None,
        sales: 0,
    };

    /// Computes statistics over `prices` (any order).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_prices(prices: &[i64]) -> Self {
        if prices.is_empty() {
            return Self::EMPTY;
        }

        let mut sorted = prices.to_vec();
        sorted.sort_unstable();

        let n = sorted.len();
        let mid = n / 2;
        let median = if n % 2 == 1 {
            sorted[mid] as f64
        } else {
            (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
        };
        let sum: i128 = sorted.iter().map(|&p| i128::from(p)).sum();
        let mean = sum as f64 / n as f64;

        Self {
            median_price: Some(median),
            mean_price: Some(mean),
            sales: n,
        }
    }
}

/// Normalization range for one level's choropleth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeBounds {
    /// Lower bound (10th percentile).
    pub min: f64,
    /// Upper bound (90th percentile), always greater than `min`.
    pub max: f64,
}

impl RangeBounds {
    /// Range used when a level has no medians at all.
    pub const DEFAULT: Self = Self { min: 0.0, max: 1.0 };

    /// Lower percentile.
    pub const LOWER: f64 = 0.1;
    /// Upper percentile.
    pub const UPPER: f64 = 0.9;

    /// Derives the 10th/90th percentile range of `medians`.
    ///
    /// Percentiles use nearest rank at `round(p * (n - 1))` (ties to even),
    /// clamped to valid indices. Equal bounds are widened by one unit.
    #[must_use]
    pub fn from_medians(medians: &[f64]) -> Self {
        if medians.is_empty() {
            return Self::DEFAULT;
        }

        let mut sorted = medians.to_vec();
        sorted.sort_by(f64::total_cmp);

        let min = percentile(&sorted, Self::LOWER);
        let mut max = percentile(&sorted, Self::UPPER);
        if (max - min).abs() < f64::EPSILON {
            max = min + 1.0;
        }

        Self { min, max }
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let last = sorted.len() - 1;
    let idx = (p * last as f64).round_ties_even().max(0.0) as usize;
    sorted[idx.min(last)]
}

/// Ranges for every boundary level of one timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelRanges {
    /// Area range.
    pub area: RangeBounds,
    /// District range.
    pub district: RangeBounds,
    /// Sector range.
    pub sector: RangeBounds,
}

impl LevelRanges {
    /// The range for `level`, or `None` for levels without polygons.
    #[must_use]
    pub const fn get(&self, level: GeoLevel) -> Option<&RangeBounds> {
        match level {
            GeoLevel::Area => Some(&self.area),
            GeoLevel::District => Some(&self.district),
            GeoLevel::Sector => Some(&self.sector),
            GeoLevel::Postcode => None,
        }
    }
}

impl Default for LevelRanges {
    fn default() -> Self {
        Self {
            area: RangeBounds::DEFAULT,
            district: RangeBounds::DEFAULT,
            sector: RangeBounds::DEFAULT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_bucket_median_is_middle_price() {
        let stats = PriceStats::from_prices(&[300, 100, 200]);
        assert_eq!(stats.median_price, Some(200.0));
        assert_eq!(stats.mean_price, Some(200.0));
        assert_eq!(stats.sales, 3);
    }

    #[test]
    fn even_bucket_median_averages_middle_pair() {
        let stats = PriceStats::from_prices(&[200, 100]);
        assert_eq!(stats.median_price, Some(150.0));
        assert_eq!(stats.mean_price, Some(150.0));
        assert_eq!(stats.sales, 2);
    }

    #[test]
    fn empty_bucket_serializes_nulls() {
        let stats = PriceStats::from_prices(&[]);
        assert_eq!(stats, PriceStats::EMPTY);
        assert_eq!(
            serde_json::to_string(&stats).unwrap(),
            r#"{"median_price":null,"mean_price":null,"sales":0}"#
        );
    }

    #[test]
    fn degenerate_range_is_widened() {
        let range = RangeBounds::from_medians(&[100.0, 100.0, 100.0]);
        assert_eq!(range, RangeBounds { min: 100.0, max: 101.0 });
    }

    #[test]
    fn range_trims_tails() {
        let medians: Vec<f64> = (1..=11).map(|v| f64::from(v) * 10.0).collect();
        let range = RangeBounds::from_medians(&medians);
        assert_eq!(range, RangeBounds { min: 20.0, max: 100.0 });
    }

    #[test]
    fn range_ignores_input_order() {
        let range = RangeBounds::from_medians(&[500.0, 100.0, 300.0]);
        assert_eq!(range, RangeBounds { min: 100.0, max: 500.0 });
    }

    #[test]
    fn empty_range_defaults() {
        assert_eq!(RangeBounds::from_medians(&[]), RangeBounds::DEFAULT);
        assert!(LevelRanges::default().get(GeoLevel::Postcode).is_none());
    }
}
