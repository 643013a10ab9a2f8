//! Input discovery and output artifact layout.

use std::path::{Path, PathBuf};

use price_map_geography_models::GeoLevel;
use price_map_source::timeline_def::TimelineDefinition;

/// Postcode coordinate reference CSVs, relative to the data root.
const POSTCODE_REFERENCE_DIR: &str = "codepo_gb/Data/CSV";

/// Boundary trees, relative to the data root, in preference order.
const BOUNDARY_ROOTS: &[&str] = &["gb-postcodes-v5", "gb-postcodes/gb-postcodes-v5"];

/// Live snapshot files, relative to the data root, in preference order.
const SNAPSHOT_FILES: &[&str] = &[
    "live/london_listings_geocoded.json",
    "london_listings_geocoded.json",
];

/// Locations of every input under the data root.
#[derive(Debug, Clone)]
pub struct InputLayout {
    root: PathBuf,
}

impl InputLayout {
    /// Creates a layout for `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The data root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of postcode coordinate reference CSVs.
    #[must_use]
    pub fn postcode_reference_dir(&self) -> PathBuf {
        self.root.join(POSTCODE_REFERENCE_DIR)
    }

    /// The first boundary tree that exists, if any.
    #[must_use]
    pub fn boundary_root(&self) -> Option<PathBuf> {
        BOUNDARY_ROOTS
            .iter()
            .map(|dir| self.root.join(dir))
            .find(|dir| dir.is_dir())
    }

    /// Candidate snapshot paths, most preferred first.
    #[must_use]
    pub fn snapshot_candidates(&self) -> Vec<PathBuf> {
        SNAPSHOT_FILES.iter().map(|file| self.root.join(file)).collect()
    }
}

/// Locations of every artifact under the output directory.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    out: PathBuf,
}

impl ArtifactLayout {
    /// Creates a layout for `out`.
    #[must_use]
    pub fn new(out: impl Into<PathBuf>) -> Self {
        Self { out: out.into() }
    }

    /// The output directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.out
    }

    /// `<timeline>/stats/`.
    #[must_use]
    pub fn stats_dir(&self, def: &TimelineDefinition) -> PathBuf {
        self.out.join(&def.output_dir).join("stats")
    }

    /// `<timeline>/postcode_points/`.
    #[must_use]
    pub fn points_dir(&self, def: &TimelineDefinition) -> PathBuf {
        self.out.join(&def.output_dir).join("postcode_points")
    }

    /// `<timeline>/stats/<level>_<month>.json`.
    #[must_use]
    pub fn stats_file(&self, def: &TimelineDefinition, level: GeoLevel, month: &str) -> PathBuf {
        self.stats_dir(def).join(format!("{level}_{month}.json"))
    }

    /// `<timeline>/postcode_points/points_<month>.geojson`.
    #[must_use]
    pub fn points_file(&self, def: &TimelineDefinition, month: &str) -> PathBuf {
        self.points_dir(def).join(format!("points_{month}.geojson"))
    }

    /// `<timeline>/stats/ranges.json`.
    #[must_use]
    pub fn ranges_file(&self, def: &TimelineDefinition) -> PathBuf {
        self.stats_dir(def).join("ranges.json")
    }

    /// `live/listings/`.
    #[must_use]
    pub fn live_dir(&self) -> PathBuf {
        self.out.join("live").join("listings")
    }
}

/// Name of the month manifest written to every timeline directory.
pub const INDEX_FILE: &str = "index.json";
