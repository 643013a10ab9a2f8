//! Inverse transverse Mercator projection for the national grid.
//!
//! Converts an easting/northing on the Airy 1830 ellipsoid grid (true origin
//! 49N 2W, false origin 400 km W / 100 km N) into latitude and longitude in
//! degrees on the same datum. No datum shift is applied.

use price_map_geography_models::{GeoPoint, GridReference};

/// Airy 1830 semi-major axis (metres).
const A: f64 = 6_377_563.396;
/// Airy 1830 semi-minor axis (metres).
const B: f64 = 6_356_256.910;
/// Scale factor on the central meridian.
const F0: f64 = 0.999_601_271_7;
/// True origin latitude (degrees).
const LAT0_DEG: f64 = 49.0;
/// True origin longitude (degrees).
const LON0_DEG: f64 = -2.0;
/// Northing of the true origin (metres).
const N0: f64 = -100_000.0;
/// Easting of the true origin (metres).
const E0: f64 = 400_000.0;
/// Meridional arc residual at which footpoint iteration stops (metres).
const ARC_TOLERANCE: f64 = 0.000_01;

/// Converts a grid reference to a [`GeoPoint`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn grid_to_geo(grid: GridReference) -> GeoPoint {
    let (lat, lng) = inverse_transverse_mercator(grid.easting as f64, grid.northing as f64);
    GeoPoint::new(lat, lng)
}

/// Runs the inverse projection on raw metre values and returns
/// `(lat, lng)` in degrees.
#[must_use]
#[allow(clippy::many_single_char_names, clippy::similar_names)]
pub fn inverse_transverse_mercator(easting: f64, northing: f64) -> (f64, f64) {
    let lat0 = LAT0_DEG.to_radians();
    let lon0 = LON0_DEG.to_radians();
    let e2 = 1.0 - (B * B) / (A * A);
    let n = (A - B) / (A + B);

    let mut lat = lat0;
    let mut m = 0.0;
    loop {
        lat += (northing - N0 - m) / (A * F0);
        m = meridional_arc(lat, lat0, n);
        if (northing - N0 - m).abs() < ARC_TOLERANCE {
            break;
        }
    }

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let nu = A * F0 / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let rho = A * F0 * (1.0 - e2) / (1.0 - e2 * sin_lat * sin_lat).powf(1.5);
    let eta2 = nu / rho - 1.0;

    let tan_lat = lat.tan();
    let tan2 = tan_lat * tan_lat;
    let tan4 = tan2 * tan2;
    let tan6 = tan4 * tan2;
    let sec_lat = 1.0 / cos_lat;
    let nu3 = nu * nu * nu;
    let nu5 = nu3 * nu * nu;
    let nu7 = nu5 * nu * nu;

    let vii = tan_lat / (2.0 * rho * nu);
    let viii = tan_lat / (24.0 * rho * nu3) * (5.0 + 3.0 * tan2 + eta2 - 9.0 * tan2 * eta2);
    let ix = tan_lat / (720.0 * rho * nu5) * (61.0 + 90.0 * tan2 + 45.0 * tan4);
    let x = sec_lat / nu;
    let xi = sec_lat / (6.0 * nu3) * (nu / rho + 2.0 * tan2);
    let xii = sec_lat / (120.0 * nu5) * (5.0 + 28.0 * tan2 + 24.0 * tan4);
    let xiia = sec_lat / (5040.0 * nu7) * (61.0 + 662.0 * tan2 + 1320.0 * tan4 + 720.0 * tan6);

    let de = easting - E0;
    let de2 = de * de;
    let de3 = de2 * de;
    let de4 = de2 * de2;
    let de5 = de3 * de2;
    let de6 = de4 * de2;
    let de7 = de5 * de2;

    let lat = lat - vii * de2 + viii * de4 - ix * de6;
    let lon = lon0 + x * de - xi * de3 + xii * de5 - xiia * de7;

    (lat.to_degrees(), lon.to_degrees())
}

/// Developed meridional arc from the true origin latitude to `lat`.
fn meridional_arc(lat: f64, lat0: f64, n: f64) -> f64 {
    let n2 = n * n;
    let n3 = n2 * n;
    let dlat = lat - lat0;
    let slat = lat + lat0;

    let ma = (1.0 + n + 1.25 * n2 + 1.25 * n3) * dlat;
    let mb = (3.0 * n + 3.0 * n2 + 21.0 / 8.0 * n3) * dlat.sin() * slat.cos();
    let mc = (15.0 / 8.0 * n2 + 15.0 / 8.0 * n3) * (2.0 * dlat).sin() * (2.0 * slat).cos();
    let md = 35.0 / 24.0 * n3 * (3.0 * dlat).sin() * (3.0 * slat).cos();

    B * F0 * (ma - mb + mc - md)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE_DEG: f64 = 1e-6;

    fn assert_close(actual: GeoPoint, lat: f64, lng: f64) {
        assert!(
            (actual.lat - lat).abs() < TOLERANCE_DEG,
            "lat {} != {lat}",
            actual.lat
        );
        assert!(
            (actual.lng - lng).abs() < TOLERANCE_DEG,
            "lng {} != {lng}",
            actual.lng
        );
    }

    #[test]
    fn ordnance_survey_worked_example() {
        // 52°39'27.2531"N 1°43'04.5177"E
        let (lat, lng) = inverse_transverse_mercator(651_409.903, 313_177.270);
        let expected_lat = 52.0 + 39.0 / 60.0 + 27.2531 / 3600.0;
        let expected_lng = 1.0 + 43.0 / 60.0 + 4.5177 / 3600.0;
        assert_close(GeoPoint::new(lat, lng), expected_lat, expected_lng);
    }

    #[test]
    fn true_origin_maps_to_origin_coordinates() {
        let point = grid_to_geo(GridReference::new(400_000, -100_000));
        assert_close(point, 49.0, -2.0);
    }

    #[test]
    fn london_postcode_centroids() {
        // E1 0AA
        assert_close(
            grid_to_geo(GridReference::new(535_267, 181_084)),
            51.511_986_013_886,
            -0.050_482_584_302,
        );
        assert_close(
            grid_to_geo(GridReference::new(529_090, 179_645)),
            51.500_498_005_319,
            -0.139_982_926_311,
        );
    }

    #[test]
    fn far_west_of_central_meridian() {
        assert_close(
            grid_to_geo(GridReference::new(100_000, 900_000)),
            57.888_566_419_071,
            -7.063_003_878_425,
        );
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let grid = GridReference::new(530_000, 180_000);
        assert_eq!(grid_to_geo(grid), grid_to_geo(grid));
    }
}
