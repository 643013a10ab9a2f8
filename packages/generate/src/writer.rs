//! Serialization of timeline and overlay artifacts.
//!
//! Every document is written to a `.tmp` sibling first and renamed into
//! place, so a reader never observes a half-written file.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use chrono::Utc;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use price_map_analytics::aggregate::Aggregates;
use price_map_analytics::ranges::{CodeUniverse, level_month_stats, level_ranges};
use price_map_analytics_models::LevelRanges;
use price_map_geography::postcodes::PostcodeCoordinates;
use price_map_geography_models::{GeoLevel, normalize};
use price_map_listings::overlay::Overlay;
use price_map_listings::snapshot::Snapshot;
use price_map_source::timeline_def::TimelineDefinition;
use serde::Serialize;

use crate::GenerateError;
use crate::paths::{ArtifactLayout, INDEX_FILE};

/// `index.json` contents.
#[derive(Debug, Serialize)]
struct MonthIndex<'a> {
    months: &'a [&'a str],
}

/// What [`write_timeline`] produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineOutput {
    /// Months written, in chronological order.
    pub months: Vec<String>,
    /// Ranges written to `ranges.json`.
    pub ranges: LevelRanges,
    /// Point features written across all months.
    pub points: usize,
}

/// Serializes `value` as JSON to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns [`GenerateError`] if the file cannot be written.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), GenerateError> {
    let tmp_path = tmp_sibling(path);
    let file = File::create(&tmp_path).map_err(|e| GenerateError::io(&tmp_path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush().map_err(|e| GenerateError::io(&tmp_path, e))?;
    drop(writer);
    std::fs::rename(&tmp_path, path).map_err(|e| GenerateError::io(path, e))?;
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn create_dir(path: &Path) -> Result<(), GenerateError> {
    std::fs::create_dir_all(path).map_err(|e| GenerateError::io(path, e))
}

/// Writes every artifact of one timeline: per-month stats documents for
/// each level, per-month postcode points, both month indexes, and the
/// ranges document.
///
/// A timeline without months writes nothing.
///
/// # Errors
///
/// Returns [`GenerateError`] if a directory or file cannot be written.
pub fn write_timeline(
    layout: &ArtifactLayout,
    def: &TimelineDefinition,
    aggregates: &Aggregates,
    universe: &CodeUniverse,
    coords: &PostcodeCoordinates,
) -> Result<TimelineOutput, GenerateError> {
    let months: Vec<&str> = aggregates.months().collect();
    if months.is_empty() {
        log::info!("{}: no months observed, nothing written", def.name);
        return Ok(TimelineOutput {
            months: Vec::new(),
            ranges: LevelRanges::default(),
            points: 0,
        });
    }

    let stats_dir = layout.stats_dir(def);
    let points_dir = layout.points_dir(def);
    create_dir(&stats_dir)?;
    create_dir(&points_dir)?;

    let no_codes = BTreeSet::new();
    let mut points = 0;
    for month in &months {
        for level in GeoLevel::BOUNDARY_LEVELS {
            let codes = universe.get(level).unwrap_or(&no_codes);
            let stats = level_month_stats(aggregates, level, month, codes);
            write_json(&layout.stats_file(def, level, month), &stats)?;
        }

        let collection = postcode_points(aggregates, month, coords);
        points += collection.features.len();
        write_json(&layout.points_file(def, month), &collection)?;
    }

    let index = MonthIndex { months: &months };
    write_json(&stats_dir.join(INDEX_FILE), &index)?;
    write_json(&points_dir.join(INDEX_FILE), &index)?;

    let ranges = level_ranges(aggregates, universe);
    write_json(&layout.ranges_file(def), &ranges)?;

    log::info!(
        "{}: wrote {} months, {points} postcode points",
        def.name,
        months.len()
    );

    Ok(TimelineOutput {
        months: months.iter().map(ToString::to_string).collect(),
        ranges,
        points,
    })
}

/// One point per postcode observed in `month` that has a coordinate.
#[must_use]
pub fn postcode_points(
    aggregates: &Aggregates,
    month: &str,
    coords: &PostcodeCoordinates,
) -> FeatureCollection {
    let features = aggregates
        .month_stats(GeoLevel::Postcode, month)
        .into_iter()
        .filter_map(|(code, stats)| {
            let location = coords.get(&normalize(code))?;

            let mut properties = JsonObject::new();
            properties.insert(
                "postcode".to_string(),
                serde_json::Value::String(location.display.clone()),
            );
            properties.insert("median_price".to_string(), stats.median_price.into());
            properties.insert("mean_price".to_string(), stats.mean_price.into());
            properties.insert("sales".to_string(), stats.sales.into());

            Some(Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::Point(
                    location.point.position(),
                ))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Writes `listings.geojson` and `meta.json`, plus `approximate.geojson`
/// when the overlay placed any listings approximately.
///
/// # Errors
///
/// Returns [`GenerateError`] if a directory or file cannot be written.
pub fn write_overlay(
    layout: &ArtifactLayout,
    overlay: &Overlay,
    snapshot: &Snapshot,
) -> Result<(), GenerateError> {
    let dir = layout.live_dir();
    create_dir(&dir)?;

    write_json(&dir.join("listings.geojson"), &overlay.exact_collection())?;
    if !overlay.approximate_features.is_empty() {
        write_json(&dir.join("approximate.geojson"), &overlay.approximate_collection())?;
    }
    write_json(&dir.join("meta.json"), &overlay.meta(snapshot, Utc::now()))?;

    log::info!(
        "Live overlay: wrote {} points to {}",
        overlay.features.len(),
        dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use price_map_geography_models::GridReference;
    use price_map_source::registry::find_timeline;
    use price_map_source_models::PriceObservation;

    use super::*;

    fn temp_out(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("price_map_writer_{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn read(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn write_json_replaces_atomically() {
        let out = temp_out("atomic");
        let path = out.join("doc.json");
        write_json(&path, &serde_json::json!({"a": 1})).unwrap();
        write_json(&path, &serde_json::json!({"a": 2})).unwrap();
        assert_eq!(read(&path)["a"], 2);
        assert!(!out.join("doc.json.tmp").exists());
    }

    #[test]
    fn points_skip_postcodes_without_coordinates() {
        let mut agg = Aggregates::default();
        agg.add(PriceObservation::new(100, "2024-01".to_string(), "E1 6AN"));
        agg.add(PriceObservation::new(300, "2024-01".to_string(), "E1 6AN"));
        agg.add(PriceObservation::new(500, "2024-01".to_string(), "ZZ9 9ZZ"));

        let mut coords = PostcodeCoordinates::default();
        coords.insert("E1 6AN", GridReference::new(533_700, 181_900));

        let collection = postcode_points(&agg, "2024-01", &coords);
        assert_eq!(collection.features.len(), 1);

        let feature = &collection.features[0];
        assert_eq!(feature.property("postcode"), Some(&serde_json::json!("E1 6AN")));
        assert_eq!(feature.property("median_price"), Some(&serde_json::json!(200.0)));
        assert_eq!(feature.property("sales"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn empty_timeline_writes_nothing() {
        let out = temp_out("empty");
        let layout = ArtifactLayout::new(&out);
        let def = find_timeline("predicted").unwrap();

        let output = write_timeline(
            &layout,
            &def,
            &Aggregates::default(),
            &CodeUniverse::default(),
            &PostcodeCoordinates::default(),
        )
        .unwrap();

        assert!(output.months.is_empty());
        assert!(!out.join("predicted").exists());
    }

    #[test]
    fn timeline_documents_cover_every_month_and_code() {
        let out = temp_out("timeline");
        let layout = ArtifactLayout::new(&out);
        let def = find_timeline("historical").unwrap();

        let mut agg = Aggregates::default();
        agg.add(PriceObservation::new(100, "2024-02".to_string(), "E1 6AN"));
        agg.add(PriceObservation::new(200, "2024-01".to_string(), "E2 8BB"));

        let universe = CodeUniverse::resolve(|_| BTreeSet::new(), &[&agg]);
        let output = write_timeline(
            &layout,
            &def,
            &agg,
            &universe,
            &PostcodeCoordinates::default(),
        )
        .unwrap();

        assert_eq!(output.months, vec!["2024-01", "2024-02"]);

        let index = read(&out.join("historical/stats/index.json"));
        assert_eq!(index, serde_json::json!({"months": ["2024-01", "2024-02"]}));
        assert_eq!(
            read(&out.join("historical/postcode_points/index.json")),
            index
        );

        let january = read(&out.join("historical/stats/district_2024-01.json"));
        assert_eq!(january["E1"]["sales"], 0);
        assert!(january["E1"]["median_price"].is_null());
        assert_eq!(january["E2"]["median_price"], 200.0);

        let ranges = read(&out.join("historical/stats/ranges.json"));
        assert_eq!(ranges["district"]["min"], 100.0);
        assert_eq!(ranges["district"]["max"], 200.0);
        assert!(out.join("historical/stats/sector_2024-02.json").is_file());
        assert!(out.join("historical/postcode_points/points_2024-02.geojson").is_file());
    }
}
