//! In-memory price buckets keyed by level, month, and code.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use price_map_analytics_models::PriceStats;
use price_map_geography_models::GeoLevel;
use price_map_source_models::PriceObservation;

/// Month -> code -> prices for one level.
pub type MonthBuckets = BTreeMap<String, HashMap<String, Vec<i64>>>;

/// Price buckets of one timeline at every level.
///
/// Each accepted observation lands in up to four buckets: its exact
/// postcode, and its area, district, and sector when those are non-empty.
#[derive(Debug, Default)]
pub struct Aggregates {
    months: BTreeSet<String>,
    postcode: MonthBuckets,
    area: MonthBuckets,
    district: MonthBuckets,
    sector: MonthBuckets,
    observations: u64,
}

impl Aggregates {
    /// Adds one observation to every bucket it belongs to.
    pub fn add(&mut self, obs: PriceObservation) {
        let PriceObservation {
            price,
            month,
            postcode,
            hierarchy,
        } = obs;

        for level in GeoLevel::BOUNDARY_LEVELS {
            if let Some(code) = hierarchy.code(level) {
                push(self.level_mut(level), &month, code, price);
            }
        }
        push(&mut self.postcode, &month, postcode.as_str(), price);

        self.months.insert(month);
        self.observations += 1;
    }

    /// Folds `other` into `self`. Prices are appended, so merging partials
    /// in a fixed order yields the same buckets as a sequential scan.
    pub fn merge(&mut self, other: Self) {
        let Self {
            months,
            postcode,
            area,
            district,
            sector,
            observations,
        } = other;

        merge_buckets(&mut self.postcode, postcode);
        merge_buckets(&mut self.area, area);
        merge_buckets(&mut self.district, district);
        merge_buckets(&mut self.sector, sector);
        self.months.extend(months);
        self.observations += observations;
    }

    /// Observed months, in chronological order.
    pub fn months(&self) -> impl Iterator<Item = &str> {
        self.months.iter().map(String::as_str)
    }

    /// Number of distinct months observed.
    #[must_use]
    pub fn month_count(&self) -> usize {
        self.months.len()
    }

    /// Returns `true` if nothing was aggregated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Number of observations added.
    #[must_use]
    pub const fn observations(&self) -> u64 {
        self.observations
    }

    /// All buckets of `level`.
    #[must_use]
    pub const fn level(&self, level: GeoLevel) -> &MonthBuckets {
        match level {
            GeoLevel::Postcode => &self.postcode,
            GeoLevel::Area => &self.area,
            GeoLevel::District => &self.district,
            GeoLevel::Sector => &self.sector,
        }
    }

    const fn level_mut(&mut self, level: GeoLevel) -> &mut MonthBuckets {
        match level {
            GeoLevel::Postcode => &mut self.postcode,
            GeoLevel::Area => &mut self.area,
            GeoLevel::District => &mut self.district,
            GeoLevel::Sector => &mut self.sector,
        }
    }

    /// Prices of one bucket; empty when nothing was observed.
    #[must_use]
    pub fn prices(&self, level: GeoLevel, month: &str, code: &str) -> &[i64] {
        self.level(level)
            .get(month)
            .and_then(|codes| codes.get(code))
            .map_or(&[], Vec::as_slice)
    }

    /// Statistics of one bucket.
    #[must_use]
    pub fn stats(&self, level: GeoLevel, month: &str, code: &str) -> PriceStats {
        PriceStats::from_prices(self.prices(level, month, code))
    }

    /// Every code observed at `level` in any month.
    #[must_use]
    pub fn codes(&self, level: GeoLevel) -> BTreeSet<String> {
        self.level(level)
            .values()
            .flat_map(HashMap::keys)
            .cloned()
            .collect()
    }

    /// Codes observed at `level` in `month`, sorted, with their statistics.
    #[must_use]
    pub fn month_stats(&self, level: GeoLevel, month: &str) -> BTreeMap<&str, PriceStats> {
        self.level(level)
            .get(month)
            .map(|codes| {
                codes
                    .iter()
                    .map(|(code, prices)| (code.as_str(), PriceStats::from_prices(prices)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn push(buckets: &mut MonthBuckets, month: &str, code: &str, price: i64) {
    let codes = match buckets.get_mut(month) {
        Some(codes) => codes,
        None => buckets.entry(month.to_string()).or_default(),
    };
    match codes.get_mut(code) {
        Some(prices) => prices.push(price),
        None => {
            codes.insert(code.to_string(), vec![price]);
        }
    }
}

fn merge_buckets(into: &mut MonthBuckets, from: MonthBuckets) {
    for (month, codes) in from {
        let target = into.entry(month).or_default();
        for (code, mut prices) in codes {
            target.entry(code).or_default().append(&mut prices);
        }
    }
}
