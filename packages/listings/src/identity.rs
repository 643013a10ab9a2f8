//! Content-addressed listing ids and deterministic placement jitter.

use std::f64::consts::TAU;

use price_map_geography_models::GeoPoint;
use sha2::{Digest, Sha256};

/// Hex characters kept from the digest.
pub const ID_LEN: usize = 16;

/// Maximum jitter radius in degrees.
pub const JITTER_RADIUS_DEG: f64 = 0.01;

/// Stable id of a listing: the first [`ID_LEN`] hex characters of
/// SHA-256 over `kind|url`.
#[must_use]
pub fn listing_id(kind: &str, url: &str) -> String {
    let digest = Sha256::digest(format!("{kind}|{url}").as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(ID_LEN);
    id
}

/// Offsets `center` by a pseudo-random but reproducible amount derived
/// from `seed`.
///
/// The offset lies within [`JITTER_RADIUS_DEG`] of the center, uniformly
/// over the disc; the longitude component is widened by
/// `1 / max(0.25, cos(lat))` so the disc stays roughly round on the map.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn deterministic_jitter(seed: &str, center: GeoPoint) -> GeoPoint {
    let digest = Sha256::digest(seed.as_bytes());

    let mut head = [0u8; 8];
    let mut tail = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    tail.copy_from_slice(&digest[8..16]);

    let a = u64::from_be_bytes(head) as f64 / u64::MAX as f64;
    let b = u64::from_be_bytes(tail) as f64 / u64::MAX as f64;

    let angle = a * TAU;
    let radius = b.sqrt() * JITTER_RADIUS_DEG;
    let dlat = angle.sin() * radius;
    let dlng = angle.cos() * radius / center.lat.to_radians().cos().max(0.25);

    GeoPoint::new(center.lat + dlat, center.lng + dlng)
}
