//! Conversion of a listings snapshot into point features.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, feature::Id};
use price_map_geography_models::GeoPoint;
use serde::Serialize;
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::identity::{deterministic_jitter, listing_id};
use crate::snapshot::Snapshot;

/// Whether a listing is for sale or to rent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ListingKind {
    /// For sale; priced by `sale_price`.
    Sale,
    /// To rent; priced by `rent_pcm`.
    Rent,
}

impl ListingKind {
    /// Both kinds, in the order they are read from each district.
    pub const ALL: [Self; 2] = [Self::Sale, Self::Rent];

    /// Key of this kind's listing array in a district entry.
    #[must_use]
    pub const fn collection_key(self) -> &'static str {
        match self {
            Self::Sale => "saleListings",
            Self::Rent => "rentListings",
        }
    }

    /// Key of this kind's price field in a listing.
    #[must_use]
    pub const fn price_key(self) -> &'static str {
        match self {
            Self::Sale => "sale_price",
            Self::Rent => "rent_pcm",
        }
    }
}

/// How listings without coordinates are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverlayMode {
    /// Only listings with real coordinates become points.
    #[default]
    Exact,
    /// Listings without coordinates are also placed, jittered around their
    /// district center, into a separate layer tagged `approximate`.
    Approximate,
}

/// Data-quality counters of one overlay build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayCounters {
    /// Every listing entry seen, including malformed ones.
    pub total: u64,
    /// Listings with numeric latitude and longitude.
    pub geocoded: u64,
    /// Listings with a URL but without usable coordinates.
    pub skipped_no_coords: u64,
    /// Listings placed approximately.
    pub approximate: u64,
}

/// The built overlay.
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    /// Points at real listing coordinates.
    pub features: Vec<Feature>,
    /// Jittered district-center points (approximate mode only).
    pub approximate_features: Vec<Feature>,
    /// Counters.
    pub counters: OverlayCounters,
}

impl Overlay {
    /// The exact point layer as a feature collection.
    #[must_use]
    pub fn exact_collection(&self) -> FeatureCollection {
        collection(self.features.clone())
    }

    /// The approximate point layer as a feature collection.
    #[must_use]
    pub fn approximate_collection(&self) -> FeatureCollection {
        collection(self.approximate_features.clone())
    }

    /// Metadata document describing this overlay.
    #[must_use]
    pub fn meta<'a>(&self, snapshot: &'a Snapshot, generated_at: DateTime<Utc>) -> OverlayMeta<'a> {
        OverlayMeta {
            source: snapshot.source.display().to_string(),
            generated_at,
            total_listings: self.counters.total,
            point_features: self.features.len(),
            geocoded_listings: self.counters.geocoded,
            skipped_no_coords: self.counters.skipped_no_coords,
            approximate_listings: self.counters.approximate,
            raw_meta: &snapshot.meta,
        }
    }
}

/// Serialized next to the overlay as `meta.json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayMeta<'a> {
    /// Snapshot path.
    pub source: String,
    /// Build time.
    pub generated_at: DateTime<Utc>,
    /// Every listing entry seen.
    pub total_listings: u64,
    /// Features in the exact layer.
    pub point_features: usize,
    /// Listings with coordinates.
    pub geocoded_listings: u64,
    /// Listings without coordinates.
    pub skipped_no_coords: u64,
    /// Features in the approximate layer.
    pub approximate_listings: u64,
    /// The snapshot's own metadata.
    pub raw_meta: &'a Value,
}

/// Builds the overlay from `snapshot`.
///
/// `centers` maps district codes to the point approximate listings are
/// jittered around; it is only consulted in [`OverlayMode::Approximate`].
#[must_use]
pub fn build_overlay(
    snapshot: &Snapshot,
    centers: &BTreeMap<String, GeoPoint>,
    mode: OverlayMode,
) -> Overlay {
    let mut overlay = Overlay::default();

    for (district, entry) in &snapshot.areas {
        let Some(entry) = entry.as_object() else {
            continue;
        };
        for kind in ListingKind::ALL {
            let Some(listings) = entry.get(kind.collection_key()).and_then(Value::as_array) else {
                continue;
            };
            for listing in listings {
                push_listing(&mut overlay, kind, district, listing, centers, mode);
            }
        }
    }

    log::info!(
        "Live overlay: {} listings, {} geocoded, {} without coordinates, {} approximate",
        overlay.counters.total,
        overlay.counters.geocoded,
        overlay.counters.skipped_no_coords,
        overlay.counters.approximate
    );

    overlay
}

fn push_listing(
    overlay: &mut Overlay,
    kind: ListingKind,
    district: &str,
    listing: &Value,
    centers: &BTreeMap<String, GeoPoint>,
    mode: OverlayMode,
) {
    overlay.counters.total += 1;

    let Some(fields) = listing.as_object() else {
        return;
    };
    let Some(url) = listing_url(fields.get("listing_url")) else {
        return;
    };

    let coords = fields
        .get("latitude")
        .and_then(Value::as_f64)
        .zip(fields.get("longitude").and_then(Value::as_f64));

    let (point, approximate) = if let Some((lat, lng)) = coords {
        overlay.counters.geocoded += 1;
        (GeoPoint::new(lat, lng), false)
    } else {
        overlay.counters.skipped_no_coords += 1;
        if mode == OverlayMode::Exact {
            return;
        }
        let Some(center) = centers.get(district) else {
            log::trace!("No center for district {district}; dropping {url}");
            return;
        };
        let seed = format!("{kind}|{url}");
        (deterministic_jitter(&seed, *center), true)
    };

    let mut properties = JsonObject::new();
    properties.insert("kind".to_string(), Value::String(kind.to_string()));
    properties.insert("district".to_string(), Value::String(district.to_string()));
    properties.insert("price".to_string(), field(fields, kind.price_key()));
    properties.insert("bedrooms".to_string(), field(fields, "bedrooms"));
    properties.insert("address".to_string(), field(fields, "street_address"));
    properties.insert("url".to_string(), Value::String(url.clone()));
    properties.insert("approximate".to_string(), Value::Bool(approximate));

    let feature = Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::Point(point.position()))),
        id: Some(Id::String(listing_id(kind.as_ref(), &url))),
        properties: Some(properties),
        foreign_members: None,
    };

    if approximate {
        overlay.counters.approximate += 1;
        overlay.approximate_features.push(feature);
    } else {
        overlay.features.push(feature);
    }
}

/// The listing URL as text; `None` when absent or empty.
fn listing_url(value: Option<&Value>) -> Option<String> {
    let url = match value? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!url.is_empty()).then_some(url)
}

fn field(fields: &serde_json::Map<String, Value>, key: &str) -> Value {
    fields.get(key).cloned().unwrap_or(Value::Null)
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;

    fn snapshot(document: Value) -> Snapshot {
        Snapshot::from_value(PathBuf::from("live.json"), document).unwrap()
    }

    fn sample() -> Snapshot {
        snapshot(json!({
            "meta": {"scraped": "2026-10-01"},
            "areas": {
                "E1": {
                    "saleListings": [
                        {
                            "listing_url": "https://x/1",
                            "latitude": 51.52,
                            "longitude": -0.07,
                            "sale_price": 450000,
                            "bedrooms": 2,
                            "street_address": "1 Brick Lane"
                        },
                        {"listing_url": "https://x/2", "sale_price": 300000},
                        {"sale_price": 100000, "latitude": 51.5, "longitude": -0.1},
                        "not an object"
                    ],
                    "rentListings": [
                        {
                            "listing_url": "https://x/3",
                            "latitude": 51.51,
                            "longitude": -0.06,
                            "rent_pcm": 2100,
                            "sale_price": 999
                        }
                    ]
                },
                "N1": "garbage"
            }
        }))
    }

    fn centers() -> BTreeMap<String, GeoPoint> {
        BTreeMap::from([("E1".to_string(), GeoPoint::new(51.515, -0.065))])
    }

    #[test]
    fn exact_mode_emits_only_geocoded_listings() {
        let overlay = build_overlay(&sample(), &centers(), OverlayMode::Exact);

        assert_eq!(
            overlay.counters,
            OverlayCounters {
                total: 5,
                geocoded: 2,
                skipped_no_coords: 1,
                approximate: 0,
            }
        );
        assert_eq!(overlay.features.len(), 2);
        assert!(overlay.approximate_features.is_empty());

        let urls: Vec<&str> = overlay
            .features
            .iter()
            .map(|f| f.property("url").and_then(Value::as_str).unwrap())
            .collect();
        assert!(!urls.contains(&"https://x/2"));
    }

    #[test]
    fn feature_properties_follow_kind() {
        let overlay = build_overlay(&sample(), &centers(), OverlayMode::Exact);

        let sale = &overlay.features[0];
        assert_eq!(sale.id, Some(Id::String(listing_id("sale", "https://x/1"))));
        assert_eq!(sale.property("price"), Some(&json!(450000)));
        assert_eq!(sale.property("address"), Some(&json!("1 Brick Lane")));
        assert_eq!(sale.property("approximate"), Some(&json!(false)));
        assert_eq!(
            sale.geometry.as_ref().unwrap().value,
            geojson::Value::Point(vec![-0.07, 51.52])
        );

        let rent = &overlay.features[1];
        assert_eq!(rent.property("kind"), Some(&json!("rent")));
        assert_eq!(rent.property("price"), Some(&json!(2100)));
        assert_eq!(rent.property("bedrooms"), Some(&Value::Null));
    }

    #[test]
    fn approximate_mode_uses_a_separate_layer() {
        let overlay = build_overlay(&sample(), &centers(), OverlayMode::Approximate);

        assert_eq!(overlay.features.len(), 2);
        assert_eq!(overlay.approximate_features.len(), 1);
        assert_eq!(overlay.counters.skipped_no_coords, 1);
        assert_eq!(overlay.counters.approximate, 1);

        let approx = &overlay.approximate_features[0];
        assert_eq!(approx.property("approximate"), Some(&json!(true)));
        let expected = deterministic_jitter("sale|https://x/2", GeoPoint::new(51.515, -0.065));
        assert_eq!(
            approx.geometry.as_ref().unwrap().value,
            geojson::Value::Point(expected.position())
        );
    }

    #[test]
    fn approximate_mode_needs_a_center() {
        let overlay = build_overlay(&sample(), &BTreeMap::new(), OverlayMode::Approximate);
        assert!(overlay.approximate_features.is_empty());
        assert_eq!(overlay.counters.skipped_no_coords, 1);
    }

    #[test]
    fn meta_reports_counts_and_raw_meta() {
        let snapshot = sample();
        let overlay = build_overlay(&snapshot, &centers(), OverlayMode::Exact);
        let meta = serde_json::to_value(overlay.meta(&snapshot, Utc::now())).unwrap();

        assert_eq!(meta["source"], "live.json");
        assert_eq!(meta["totalListings"], 5);
        assert_eq!(meta["pointFeatures"], 2);
        assert_eq!(meta["geocodedListings"], 2);
        assert_eq!(meta["skippedNoCoords"], 1);
        assert_eq!(meta["approximateListings"], 0);
        assert_eq!(meta["rawMeta"]["scraped"], "2026-10-01");
        assert!(meta["generatedAt"].is_string());
    }
}
