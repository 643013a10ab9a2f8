#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Batch pipeline that builds the house price map artifacts.
//!
//! One run resolves the boundary polygons, loads postcode coordinates,
//! aggregates each configured timeline (historical sales, predicted
//! prices), and writes the per-month stats, point layers, month indexes,
//! and color ranges the map frontend reads. The live listings overlay is
//! built once per run, independent of any timeline.
//!
//! Inputs that are merely missing degrade the output (no polygons, no
//! points, no overlay); only a missing required timeline input aborts.

pub mod paths;
pub mod writer;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use price_map_analytics::AnalyticsError;
use price_map_analytics::engine::scan_timeline;
use price_map_analytics::ranges::CodeUniverse;
use price_map_geography::GeoError;
use price_map_geography::boundaries::{
    Boundaries, BoundaryCache, BoundaryResolver, StoreOutcome,
};
use price_map_geography::postcodes::{self, PostcodeCoordinates};
use price_map_geography_models::GeoLevel;
use price_map_listings::overlay::{OverlayCounters, OverlayMode, build_overlay};
use price_map_listings::snapshot::load_snapshot;
use price_map_source::SourceError;
use price_map_source::progress::{ProgressCallback, null_progress};
use price_map_source::scan::discover_files;
use price_map_source::timeline_def::TimelineDefinition;
use thiserror::Error;

use crate::paths::{ArtifactLayout, InputLayout};
use crate::writer::{TimelineOutput, write_overlay, write_timeline};

/// Errors that can abort a generation run.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Boundary or postcode reference loading failed.
    #[error(transparent)]
    Geo(#[from] GeoError),

    /// A timeline could not be scanned.
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// A timeline definition is unknown or invalid.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// An artifact could not be written.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An artifact could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A blocking task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl GenerateError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Shared arguments for all generate subcommands.
#[derive(Debug, Clone)]
pub struct GenerateArgs {
    /// Data root holding the raw inputs.
    pub root: PathBuf,
    /// Artifact output directory.
    pub output_dir: PathBuf,
    /// Place listings without coordinates approximately.
    pub approximate_listings: bool,
}

impl GenerateArgs {
    /// Arguments with the default output directory (`<root>/data`).
    #[must_use]
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            output_dir: root.join("data"),
            root,
            approximate_listings: false,
        }
    }

    const fn overlay_mode(&self) -> OverlayMode {
        if self.approximate_listings {
            OverlayMode::Approximate
        } else {
            OverlayMode::Exact
        }
    }
}

/// Which parts of the artifact tree a run produces.
#[derive(Debug, Clone, Default)]
pub struct Targets {
    /// Publish the boundary collections.
    pub polygons: bool,
    /// Timelines to aggregate and write.
    pub timelines: Vec<TimelineDefinition>,
    /// Build the live listings overlay.
    pub live: bool,
}

impl Targets {
    /// Everything: polygons, every configured timeline, and the overlay.
    #[must_use]
    pub fn all() -> Self {
        Self {
            polygons: true,
            timelines: price_map_source::registry::all_timelines(),
            live: true,
        }
    }
}

/// Per-timeline outcome of a run.
#[derive(Debug, Clone)]
pub struct TimelineReport {
    /// Timeline id.
    pub id: String,
    /// What was written.
    pub output: TimelineOutput,
    /// Rows rejected while scanning.
    pub rejected: u64,
}

/// Outcome of a run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Store outcome per boundary level, when polygons were published.
    pub polygons: Vec<(GeoLevel, StoreOutcome)>,
    /// Timelines written.
    pub timelines: Vec<TimelineReport>,
    /// Overlay counters, when a snapshot was found.
    pub live: Option<OverlayCounters>,
}

/// Creates a progress reporter for a named stage.
pub type ProgressFactory<'a> = dyn Fn(&str) -> Arc<dyn ProgressCallback> + Send + Sync + 'a;

/// Runs the pipeline without progress reporting.
///
/// # Errors
///
/// See [`run_with_progress`].
pub async fn run(args: &GenerateArgs, targets: &Targets) -> Result<RunReport, GenerateError> {
    run_with_progress(args, targets, &|_: &str| null_progress()).await
}

/// Runs the pipeline, reporting scan progress through `progress`.
///
/// # Errors
///
/// Returns [`GenerateError`] if a required timeline input is missing, an
/// input cannot be read, or an artifact cannot be written.
pub async fn run_with_progress(
    args: &GenerateArgs,
    targets: &Targets,
    progress: &ProgressFactory<'_>,
) -> Result<RunReport, GenerateError> {
    let inputs = InputLayout::new(&args.root);
    let layout = ArtifactLayout::new(&args.output_dir);

    check_required_inputs(&inputs, &targets.timelines)?;

    std::fs::create_dir_all(layout.root()).map_err(|e| GenerateError::io(layout.root(), e))?;

    log::info!(
        "Generating from {} into {}",
        inputs.root().display(),
        layout.root().display()
    );

    let cache = BoundaryCache::new(layout.root());
    let resolver = BoundaryResolver::new(inputs.boundary_root(), cache.clone());
    let boundaries = resolver.resolve_all().await?;

    let mut report = RunReport::default();

    if targets.polygons {
        for level in GeoLevel::BOUNDARY_LEVELS {
            if let Some(set) = boundaries.get(level) {
                let outcome = cache.store(level, set)?;
                log::info!("{}: {outcome:?}", level.plural());
                report.polygons.push((level, outcome));
            }
        }
    }

    if !targets.timelines.is_empty() {
        report.timelines =
            generate_timelines(&inputs, &layout, &boundaries, &targets.timelines, progress).await?;
    }

    if targets.live {
        report.live = generate_live(&inputs, &layout, &boundaries, args.overlay_mode())?;
    }

    log::info!("Done.");
    Ok(report)
}

/// Fails before anything is written when a required timeline has no input
/// directory.
fn check_required_inputs(
    inputs: &InputLayout,
    timelines: &[TimelineDefinition],
) -> Result<(), GenerateError> {
    for def in timelines.iter().filter(|def| def.required) {
        discover_files(inputs.root(), def)?;
    }
    Ok(())
}

async fn generate_timelines(
    inputs: &InputLayout,
    layout: &ArtifactLayout,
    boundaries: &Boundaries,
    timelines: &[TimelineDefinition],
    progress: &ProgressFactory<'_>,
) -> Result<Vec<TimelineReport>, GenerateError> {
    let reference_dir = inputs.postcode_reference_dir();
    let coords_task = tokio::task::spawn_blocking(move || postcodes::load_dir(&reference_dir));

    let mut scans = Vec::with_capacity(timelines.len());
    for def in timelines {
        let scan = scan_timeline(inputs.root(), def, progress(&def.name)).await?;
        scans.push(scan);
    }

    let coords: PostcodeCoordinates = coords_task.await??;
    log::info!("Loaded {} postcode coordinates", coords.len());

    let aggregates: Vec<_> = scans.iter().map(|scan| &scan.aggregates).collect();
    let universe = CodeUniverse::resolve(
        |level| {
            boundaries
                .get(level)
                .map(|set| set.keys().cloned().collect::<BTreeSet<_>>())
                .unwrap_or_default()
        },
        &aggregates,
    );

    let mut reports = Vec::with_capacity(timelines.len());
    for (def, scan) in timelines.iter().zip(&scans) {
        let output = write_timeline(layout, def, &scan.aggregates, &universe, &coords)?;
        reports.push(TimelineReport {
            id: def.id.clone(),
            output,
            rejected: scan.rejects.total(),
        });
    }

    Ok(reports)
}

fn generate_live(
    inputs: &InputLayout,
    layout: &ArtifactLayout,
    boundaries: &Boundaries,
    mode: OverlayMode,
) -> Result<Option<OverlayCounters>, GenerateError> {
    let Some(snapshot) = load_snapshot(&inputs.snapshot_candidates()) else {
        return Ok(None);
    };

    let centers = price_map_spatial::bbox_centers(&boundaries.district);
    log::debug!("{} district centers", centers.len());

    let overlay = build_overlay(&snapshot, &centers, mode);
    write_overlay(layout, &overlay, &snapshot)?;

    Ok(Some(overlay.counters))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use price_map_source::registry::find_timeline;

    use super::*;

    const SQUARE: &str = r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},"geometry":{"type":"Polygon","coordinates":[[[-0.08,51.51],[-0.06,51.51],[-0.06,51.53],[-0.08,51.53],[-0.08,51.51]]]}}]}"#;

    fn fixture(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("price_map_generate_{name}"));
        let _ = fs::remove_dir_all(&root);

        let ppd = root.join("PPD");
        fs::create_dir_all(&ppd).unwrap();
        fs::write(
            ppd.join("2024.csv"),
            "\"{A}\",\"200000\",\"2024-01-10 00:00\",\"E1 6AN\",\"F\"\n\
             \"{B}\",\"400000\",\"2024-01-20 00:00\",\"E1 6AN\",\"F\"\n\
             \"{C}\",\"300000\",\"2024-02-01 00:00\",\"E2 8BB\",\"T\"\n\
             \"{D}\",\"oops\",\"2024-02-01 00:00\",\"E2 8BB\",\"T\"\n",
        )
        .unwrap();

        let predictions = root.join("predictions");
        fs::create_dir_all(&predictions).unwrap();
        let mut row = vec![""; 18];
        row[2] = "2025-06-01 00:00";
        row[3] = "E1 6AN";
        row[16] = "2026";
        row[17] = "310000.5";
        fs::write(
            predictions.join("bulk_property_predictions_2026.csv"),
            format!("{}\n", row.join(",")),
        )
        .unwrap();

        let codepo = root.join("codepo_gb/Data/CSV");
        fs::create_dir_all(&codepo).unwrap();
        fs::write(codepo.join("e.csv"), "\"E1 6AN\",10,533700,181900\n").unwrap();

        let districts = root.join("gb-postcodes-v5/districts/E");
        fs::create_dir_all(&districts).unwrap();
        fs::write(districts.join("E1.geojson"), SQUARE).unwrap();

        fs::create_dir_all(root.join("live")).unwrap();
        fs::write(
            root.join("live/london_listings_geocoded.json"),
            r#"{"meta":{"count":2},"areas":{"E1":{"saleListings":[
                {"listing_url":"https://x/1","latitude":51.52,"longitude":-0.07,"sale_price":500000},
                {"listing_url":"https://x/2","sale_price":450000}
            ]}}}"#,
        )
        .unwrap();

        root
    }

    fn read(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn full_run_writes_the_artifact_tree() {
        let root = fixture("full_run");
        let args = GenerateArgs::for_root(&root);
        let report = run(&args, &Targets::all()).await.unwrap();
        let out = root.join("data");

        assert!(report.polygons.contains(&(GeoLevel::District, StoreOutcome::Written(1))));
        assert!(report.polygons.contains(&(GeoLevel::Area, StoreOutcome::Skipped)));
        let districts = read(&out.join("polygons/districts.geojson"));
        assert_eq!(districts["features"][0]["id"], "E1");
        assert_eq!(districts["features"][0]["properties"]["district"], "E1");

        let historical = &report.timelines[0];
        assert_eq!(historical.output.months, vec!["2024-01", "2024-02"]);
        assert_eq!(historical.rejected, 1);

        // District universe comes from polygons: E2 has sales but no polygon.
        let feb = read(&out.join("historical/stats/district_2024-02.json"));
        assert_eq!(feb["E1"]["sales"], 0);
        assert!(feb.get("E2").is_none());
        // Area universe falls back to observed codes.
        let jan_area = read(&out.join("historical/stats/area_2024-01.json"));
        assert_eq!(jan_area["E"]["median_price"], 300_000.0);

        let points = read(&out.join("historical/postcode_points/points_2024-01.geojson"));
        assert_eq!(points["features"].as_array().unwrap().len(), 1);
        assert_eq!(points["features"][0]["properties"]["postcode"], "E1 6AN");
        assert_eq!(points["features"][0]["properties"]["mean_price"], 300_000.0);

        let ranges = read(&out.join("historical/stats/ranges.json"));
        assert_eq!(ranges["district"]["min"], 300_000.0);
        assert_eq!(ranges["district"]["max"], 300_001.0);

        let predicted = read(&out.join("predicted/stats/index.json"));
        assert_eq!(predicted["months"], serde_json::json!(["2026-06"]));
        let pred_district = read(&out.join("predicted/stats/district_2026-06.json"));
        assert_eq!(pred_district["E1"]["median_price"], 310_000.0);

        let meta = read(&out.join("live/listings/meta.json"));
        assert_eq!(meta["totalListings"], 2);
        assert_eq!(meta["pointFeatures"], 1);
        assert_eq!(meta["skippedNoCoords"], 1);
        assert_eq!(meta["rawMeta"]["count"], 2);
        assert!(!out.join("live/listings/approximate.geojson").exists());
    }

    #[tokio::test]
    async fn rerun_without_boundaries_keeps_published_polygons() {
        let root = fixture("rerun");
        let args = GenerateArgs::for_root(&root);
        run(&args, &Targets::all()).await.unwrap();

        fs::remove_dir_all(root.join("gb-postcodes-v5")).unwrap();
        let report = run(&args, &Targets::all()).await.unwrap();

        // Recovered from the published collection and rewritten unchanged.
        assert!(report.polygons.contains(&(GeoLevel::District, StoreOutcome::Written(1))));
        let districts = read(&root.join("data/polygons/districts.geojson"));
        assert_eq!(districts["features"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn approximate_listings_get_their_own_layer() {
        let root = fixture("approximate");
        let mut args = GenerateArgs::for_root(&root);
        args.approximate_listings = true;
        let targets = Targets {
            live: true,
            ..Targets::default()
        };

        let report = run(&args, &targets).await.unwrap();
        assert_eq!(report.live.unwrap().approximate, 1);

        let approx = read(&root.join("data/live/listings/approximate.geojson"));
        assert_eq!(approx["features"][0]["properties"]["approximate"], true);
        let exact = read(&root.join("data/live/listings/listings.geojson"));
        assert_eq!(exact["features"].as_array().unwrap().len(), 1);
        assert!(!root.join("data/historical").exists());
    }

    #[tokio::test]
    async fn missing_required_timeline_aborts() {
        let root = fixture("missing_ppd");
        fs::remove_dir_all(root.join("PPD")).unwrap();

        let targets = Targets {
            timelines: vec![find_timeline("historical").unwrap()],
            ..Targets::default()
        };
        let result = run(&GenerateArgs::for_root(&root), &targets).await;
        assert!(matches!(
            result,
            Err(GenerateError::Source(SourceError::MissingInput { .. }))
        ));
    }

    #[tokio::test]
    async fn missing_required_timeline_leaves_output_untouched() {
        let root = fixture("missing_ppd_untouched");
        fs::remove_dir_all(root.join("PPD")).unwrap();

        let result = run(&GenerateArgs::for_root(&root), &Targets::all()).await;
        assert!(result.is_err());
        assert!(!root.join("data").exists());
    }
}
