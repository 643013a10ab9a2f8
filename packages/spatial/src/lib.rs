#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Bounding boxes and representative centers for boundary geometries.
//!
//! The live overlay anchors each district at the center of its boundary's
//! bounding box. This crate converts `GeoJSON` geometries into `geo` types
//! and computes those envelopes.

use std::collections::BTreeMap;

use geo::{BoundingRect, Rect};
use price_map_geography_models::{BoundarySet, GeoPoint};

/// Computes the bounding box of a `GeoJSON` geometry.
///
/// Returns `None` for geometries that cannot be converted or have no
/// coordinates (e.g. an empty collection).
#[must_use]
pub fn bounding_rect(geometry: &geojson::Geometry) -> Option<Rect<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.clone().try_into().ok()?;
    geo_geom.bounding_rect()
}

/// Center of a bounding box.
#[must_use]
pub fn rect_center(rect: Rect<f64>) -> GeoPoint {
    let center = rect.center();
    GeoPoint::new(center.y, center.x)
}

/// Bounding-box centers for every boundary in `set`, keyed by code.
///
/// Boundaries whose envelope cannot be computed are omitted.
#[must_use]
pub fn bbox_centers(set: &BoundarySet) -> BTreeMap<String, GeoPoint> {
    let mut centers = BTreeMap::new();

    for (code, boundary) in set {
        match bounding_rect(&boundary.geometry) {
            Some(rect) => {
                centers.insert(code.clone(), rect_center(rect));
            }
            None => log::debug!("No bounding box for boundary {code}"),
        }
    }

    centers
}
