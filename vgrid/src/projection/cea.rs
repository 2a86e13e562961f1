//! Lambert cylindrical equal-area on the WGS84 ellipsoid, standard parallel
//! 30° (EPSG:6933, the EASE-Grid 2.0 global projection).

use super::ellipsoid::{geodetic_from_authalic, q, q_polar, WGS84_A, WGS84_E2};
use super::ProjectionError;

/// Standard parallel of EASE-Grid 2.0, degrees.
pub const STANDARD_PARALLEL_DEG: f64 = 30.0;

/// Easting of the antimeridian (meters).
pub const X_MAX: f64 = 17_367_530.445_161_372;
/// Northing of the pole (meters).
pub const Y_MAX: f64 = 7_342_230.136_498_681;

fn k0() -> f64 {
    let phi = STANDARD_PARALLEL_DEG.to_radians();
    phi.cos() / (1.0 - WGS84_E2 * phi.sin().powi(2)).sqrt()
}

/// WGS84 degrees → EPSG:6933 meters.
pub fn forward(lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError> {
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(ProjectionError::OutOfDomain { x: lon, y: lat });
    }
    let k = k0();
    let x = WGS84_A * k * lon.to_radians();
    let y = WGS84_A * q(lat.to_radians()) / (2.0 * k);
    Ok((x, y))
}

/// EPSG:6933 meters → WGS84 degrees.
pub fn inverse(x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
    if x.abs() > X_MAX * (1.0 + 1e-9) || y.abs() > Y_MAX * (1.0 + 1e-9) {
        return Err(ProjectionError::OutOfDomain { x, y });
    }
    let k = k0();
    let lon = (x / (WGS84_A * k)).to_degrees();
    let sin_beta = (2.0 * y * k / (WGS84_A * q_polar())).clamp(-1.0, 1.0);
    let lat = geodetic_from_authalic(sin_beta.asin()).to_degrees();
    Ok((lon.clamp(-180.0, 180.0), lat.clamp(-90.0, 90.0)))
}
