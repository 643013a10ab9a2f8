#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Grid reference, coordinate, and postcode hierarchy types.
//!
//! These types describe *where* a price observation lives: the projected
//! national grid reference it was published with, the WGS84-style point it
//! is rendered at, and the postal hierarchy (area, district, sector) it is
//! bucketed into.

pub mod postcode;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use postcode::{GeoHierarchy, PostcodeCode, normalize, parse};

/// A projected national grid reference (easting/northing in metres).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridReference {
    /// Metres east of the false origin.
    pub easting: i64,
    /// Metres north of the false origin.
    pub northing: i64,
}

impl GridReference {
    /// Creates a new grid reference.
    #[must_use]
    pub const fn new(easting: i64, northing: i64) -> Self {
        Self { easting, northing }
    }
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a new point.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns the point as a `GeoJSON` position (`[lng, lat]`).
    #[must_use]
    pub fn position(self) -> Vec<f64> {
        vec![self.lng, self.lat]
    }
}

/// Granularity of the postal hierarchy, from the exact postcode up to the
/// alphabetic area prefix.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GeoLevel {
    /// The full normalized postcode (e.g. `SW1A1AA`).
    Postcode,
    /// Leading alphabetic prefix of the outward code (e.g. `SW`).
    Area,
    /// The outward code (e.g. `SW1A`).
    District,
    /// Outward code plus the first inward character (e.g. `SW1A 1`).
    Sector,
}

impl GeoLevel {
    /// Levels that have boundary polygons and choropleth ranges.
    pub const BOUNDARY_LEVELS: [Self; 3] = [Self::Area, Self::District, Self::Sector];

    /// Plural name used for per-level directories and collections
    /// (e.g. `districts`).
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Postcode => "postcodes",
            Self::Area => "areas",
            Self::District => "districts",
            Self::Sector => "sectors",
        }
    }
}

/// One boundary polygon (or multipolygon) for a geographic code.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    /// The code this boundary outlines (e.g. `E1`).
    pub code: String,
    /// The boundary geometry, kept exactly as read.
    pub geometry: geojson::Geometry,
}

/// All boundaries of one level, keyed and ordered by code.
pub type BoundarySet = BTreeMap<String, BoundaryFeature>;
