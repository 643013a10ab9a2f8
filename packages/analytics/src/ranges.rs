//! Code universes and per-level choropleth ranges.

use std::collections::{BTreeMap, BTreeSet};

use price_map_analytics_models::{LevelRanges, PriceStats, RangeBounds};
use price_map_geography_models::GeoLevel;

use crate::aggregate::Aggregates;

/// The codes every stats document of a level carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeUniverse {
    /// Area codes.
    pub area: BTreeSet<String>,
    /// District codes.
    pub district: BTreeSet<String>,
    /// Sector codes.
    pub sector: BTreeSet<String>,
}

impl CodeUniverse {
    /// Builds the universe per level: the polygon codes when there are any,
    /// otherwise every code observed in any of `timelines`.
    pub fn resolve(
        mut polygon_codes: impl FnMut(GeoLevel) -> BTreeSet<String>,
        timelines: &[&Aggregates],
    ) -> Self {
        let mut universe = Self::default();
        for level in GeoLevel::BOUNDARY_LEVELS {
            let mut codes = polygon_codes(level);
            if codes.is_empty() {
                for agg in timelines {
                    codes.extend(agg.codes(level));
                }
                log::info!(
                    "No {} polygons; using {} observed codes",
                    level.plural(),
                    codes.len()
                );
            }
            if let Some(slot) = universe.get_mut(level) {
                *slot = codes;
            }
        }
        universe
    }

    /// Codes of `level`, or `None` for levels without polygons.
    #[must_use]
    pub const fn get(&self, level: GeoLevel) -> Option<&BTreeSet<String>> {
        match level {
            GeoLevel::Area => Some(&self.area),
            GeoLevel::District => Some(&self.district),
            GeoLevel::Sector => Some(&self.sector),
            GeoLevel::Postcode => None,
        }
    }

    const fn get_mut(&mut self, level: GeoLevel) -> Option<&mut BTreeSet<String>> {
        match level {
            GeoLevel::Area => Some(&mut self.area),
            GeoLevel::District => Some(&mut self.district),
            GeoLevel::Sector => Some(&mut self.sector),
            GeoLevel::Postcode => None,
        }
    }
}

/// Stats document for one level and month: every code in the universe,
/// with empty statistics where nothing sold.
#[must_use]
pub fn level_month_stats<'a>(
    aggregates: &Aggregates,
    level: GeoLevel,
    month: &str,
    codes: &'a BTreeSet<String>,
) -> BTreeMap<&'a str, PriceStats> {
    codes
        .iter()
        .map(|code| (code.as_str(), aggregates.stats(level, month, code)))
        .collect()
}

/// Medians of every non-empty bucket of `level` across all months,
/// restricted to `codes`.
#[must_use]
pub fn level_medians(aggregates: &Aggregates, level: GeoLevel, codes: &BTreeSet<String>) -> Vec<f64> {
    aggregates
        .months()
        .flat_map(|month| {
            codes
                .iter()
                .filter_map(move |code| aggregates.stats(level, month, code).median_price)
        })
        .collect()
}

/// Choropleth ranges of every boundary level of one timeline.
#[must_use]
pub fn level_ranges(aggregates: &Aggregates, universe: &CodeUniverse) -> LevelRanges {
    let range = |level: GeoLevel, codes: &BTreeSet<String>| {
        RangeBounds::from_medians(&level_medians(aggregates, level, codes))
    };

    LevelRanges {
        area: range(GeoLevel::Area, &universe.area),
        district: range(GeoLevel::District, &universe.district),
        sector: range(GeoLevel::Sector, &universe.sector),
    }
}

#[cfg(test)]
mod tests {
    use price_map_source_models::PriceObservation;

    use super::*;

    fn aggregates(rows: &[(i64, &str, &str)]) -> Aggregates {
        let mut agg = Aggregates::default();
        for (price, month, postcode) in rows {
            agg.add(PriceObservation::new(*price, (*month).to_string(), postcode));
        }
        agg
    }

    fn set(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn polygon_codes_win_over_observed_codes() {
        let hist = aggregates(&[(100, "2024-01", "E1 6AN"), (100, "2024-01", "N1 9GU")]);
        let universe = CodeUniverse::resolve(
            |level| match level {
                GeoLevel::District => set(&["E1", "E2"]),
                _ => BTreeSet::new(),
            },
            &[&hist],
        );
        assert_eq!(universe.district, set(&["E1", "E2"]));
        assert_eq!(universe.area, set(&["E", "N"]));
    }

    #[test]
    fn observed_codes_union_both_timelines() {
        let hist = aggregates(&[(100, "2024-01", "E1 6AN")]);
        let pred = aggregates(&[(100, "2026-01", "SE1 7PB")]);
        let universe = CodeUniverse::resolve(|_| BTreeSet::new(), &[&hist, &pred]);
        assert_eq!(universe.district, set(&["E1", "SE1"]));
    }

    #[test]
    fn month_stats_cover_the_whole_universe() {
        let agg = aggregates(&[(100, "2024-01", "E1 6AN"), (300, "2024-01", "E1 7AA")]);
        let codes = set(&["E1", "E2"]);
        let stats = level_month_stats(&agg, GeoLevel::District, "2024-01", &codes);
        assert_eq!(stats["E1"].median_price, Some(200.0));
        assert_eq!(stats["E2"], PriceStats::EMPTY);
    }

    #[test]
    fn ranges_use_medians_of_universe_codes_only() {
        let agg = aggregates(&[
            (100, "2024-01", "E1 6AN"),
            (100, "2024-02", "E1 6AN"),
            (9_000_000, "2024-01", "W1 1AA"),
        ]);
        let universe = CodeUniverse {
            area: set(&["E"]),
            district: set(&["E1"]),
            sector: BTreeSet::new(),
        };

        let ranges = level_ranges(&agg, &universe);
        assert_eq!(ranges.district, RangeBounds { min: 100.0, max: 101.0 });
        assert_eq!(ranges.sector, RangeBounds::DEFAULT);
    }
}
