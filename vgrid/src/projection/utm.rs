//! Transverse Mercator for UTM zones (Krüger series, third order in `n`).
//!
//! Sub-millimetre within a zone, which is well below what grid carving needs.

use super::ellipsoid::{WGS84_A, WGS84_F};
use super::ProjectionError;

/// Scale factor on the central meridian.
pub const K0: f64 = 0.9996;
/// False easting (meters).
pub const FALSE_EASTING: f64 = 500_000.0;
/// False northing of southern-hemisphere zones (meters).
pub const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

struct Series {
    a: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
    n: f64,
}

fn series() -> Series {
    let n = WGS84_F / (2.0 - WGS84_F);
    let n2 = n * n;
    let n3 = n2 * n;
    Series {
        a: WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0),
        alpha: [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
            61.0 * n3 / 240.0,
        ],
        beta: [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
            n2 / 48.0 + n3 / 15.0,
            17.0 * n3 / 480.0,
        ],
        delta: [
            2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
            7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
            56.0 * n3 / 15.0,
        ],
        n,
    }
}

/// Central meridian of a zone, degrees.
pub fn central_meridian(zone: u8) -> f64 {
    zone as f64 * 6.0 - 183.0
}

/// UTM zone containing a longitude (ignoring the Norway/Svalbard exceptions).
pub fn zone_for_lon(lon: f64) -> u8 {
    let zone = ((lon + 180.0) / 6.0).floor() as i32 + 1;
    zone.clamp(1, 60) as u8
}

/// WGS84 degrees → easting/northing in the given zone.
pub fn forward(zone: u8, north: bool, lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError> {
    if !(1..=60).contains(&zone) || !(-90.0..=90.0).contains(&lat) {
        return Err(ProjectionError::OutOfDomain { x: lon, y: lat });
    }
    let mut dlon = lon - central_meridian(zone);
    if dlon > 180.0 {
        dlon -= 360.0;
    } else if dlon < -180.0 {
        dlon += 360.0;
    }
    if dlon.abs() >= 90.0 {
        return Err(ProjectionError::OutOfDomain { x: lon, y: lat });
    }

    let s = series();
    let phi = lat.to_radians();
    let lambda = dlon.to_radians();
    let c = 2.0 * s.n.sqrt() / (1.0 + s.n);
    let t = (phi.sin().atanh() - c * (c * phi.sin()).atanh()).sinh();
    let xi_p = t.atan2(lambda.cos());
    let eta_p = (lambda.sin() / (1.0 + t * t).sqrt()).atanh();

    let mut xi = xi_p;
    let mut eta = eta_p;
    for (j, alpha) in s.alpha.iter().enumerate() {
        let k = 2.0 * (j + 1) as f64;
        xi += alpha * (k * xi_p).sin() * (k * eta_p).cosh();
        eta += alpha * (k * xi_p).cos() * (k * eta_p).sinh();
    }

    let easting = FALSE_EASTING + K0 * s.a * eta;
    let northing = K0 * s.a * xi + if north { 0.0 } else { FALSE_NORTHING_SOUTH };
    if !easting.is_finite() || !northing.is_finite() {
        return Err(ProjectionError::NonFinite);
    }
    Ok((easting, northing))
}

/// Easting/northing in the given zone → WGS84 degrees.
pub fn inverse(zone: u8, north: bool, easting: f64, northing: f64) -> Result<(f64, f64), ProjectionError> {
    if !(1..=60).contains(&zone) {
        return Err(ProjectionError::OutOfDomain { x: easting, y: northing });
    }
    let s = series();
    let n0 = if north { 0.0 } else { FALSE_NORTHING_SOUTH };
    let xi = (northing - n0) / (K0 * s.a);
    let eta = (easting - FALSE_EASTING) / (K0 * s.a);

    let mut xi_p = xi;
    let mut eta_p = eta;
    for (j, beta) in s.beta.iter().enumerate() {
        let k = 2.0 * (j + 1) as f64;
        xi_p -= beta * (k * xi).sin() * (k * eta).cosh();
        eta_p -= beta * (k * xi).cos() * (k * eta).sinh();
    }

    let chi = (xi_p.sin() / eta_p.cosh()).clamp(-1.0, 1.0).asin();
    let mut phi = chi;
    for (j, delta) in s.delta.iter().enumerate() {
        let k = 2.0 * (j + 1) as f64;
        phi += delta * (k * chi).sin();
    }
    let lambda = eta_p.sinh().atan2(xi_p.cos());

    let lon = central_meridian(zone) + lambda.to_degrees();
    let lat = phi.to_degrees();
    if !lon.is_finite() || !lat.is_finite() {
        return Err(ProjectionError::NonFinite);
    }
    Ok((lon, lat))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_central_meridian_maps_to_false_easting() {
        let (e, n) = forward(31, true, 3.0, 0.0).unwrap();
        assert!((e - FALSE_EASTING).abs() < 1e-6);
        assert!(n.abs() < 1e-6);
    }

    #[test]
    fn test_known_point() {
        // Eiffel tower, zone 31N: about 448252 E, 5411933 N
        let (e, n) = forward(31, true, 2.2945, 48.8582).unwrap();
        assert!((e - 448_252.0).abs() < 2.0, "easting {}", e);
        assert!((n - 5_411_933.0).abs() < 2.0, "northing {}", n);
    }

    #[test]
    fn test_zone_for_lon() {
        assert_eq!(zone_for_lon(-180.0), 1);
        assert_eq!(zone_for_lon(2.29), 31);
        assert_eq!(zone_for_lon(180.0), 60);
    }

    #[test]
    fn test_roundtrip_south() {
        let (e, n) = forward(23, false, -46.6, -23.5).unwrap();
        let (lon, lat) = inverse(23, false, e, n).unwrap();
        assert!((lon + 46.6).abs() < 1e-8);
        assert!((lat + 23.5).abs() < 1e-8);
    }
}
