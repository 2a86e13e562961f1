//! WGS84 ellipsoid constants and authalic-latitude conversion.
//!
//! Equal-area grids (rHEALPix, EASE-Grid 2.0) work on the authalic sphere:
//! geodetic latitude φ maps to authalic latitude β such that equal areas
//! on the ellipsoid stay equal on a sphere of radius [`AUTHALIC_RADIUS_M`].

/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS84 first eccentricity squared.
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);
/// WGS84 first eccentricity.
pub const WGS84_E: f64 = 0.081_819_190_842_622;
/// Radius of the sphere with the ellipsoid's surface area (meters).
pub const AUTHALIC_RADIUS_M: f64 = 6_371_007.180_918_475;

/// The `q` function of the authalic latitude for a geodetic latitude in radians.
pub fn q(phi: f64) -> f64 {
    let e = WGS84_E;
    let s = phi.sin();
    let es = e * s;
    (1.0 - WGS84_E2) * (s / (1.0 - es * es) - (1.0 / (2.0 * e)) * ((1.0 - es) / (1.0 + es)).ln())
}

/// `q` at the pole.
pub fn q_polar() -> f64 {
    q(std::f64::consts::FRAC_PI_2)
}

/// Geodetic → authalic latitude, radians.
pub fn authalic_from_geodetic(phi: f64) -> f64 {
    let ratio = (q(phi) / q_polar()).clamp(-1.0, 1.0);
    ratio.asin()
}

/// Authalic → geodetic latitude, radians (series to e⁶).
pub fn geodetic_from_authalic(beta: f64) -> f64 {
    let e2 = WGS84_E2;
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    beta + (e2 / 3.0 + 31.0 * e4 / 180.0 + 517.0 * e6 / 5040.0) * (2.0 * beta).sin()
        + (23.0 * e4 / 360.0 + 251.0 * e6 / 3780.0) * (4.0 * beta).sin()
        + (761.0 * e6 / 45360.0) * (6.0 * beta).sin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authalic_fixed_points() {
        assert!(authalic_from_geodetic(0.0).abs() < 1e-12);
        let pole = std::f64::consts::FRAC_PI_2;
        assert!((authalic_from_geodetic(pole) - pole).abs() < 1e-9);
    }

    #[test]
    fn test_authalic_radius_matches_ellipsoid() {
        let r = WGS84_A * (q_polar() / 2.0).sqrt();
        assert!((r - AUTHALIC_RADIUS_M).abs() < 1e-3, "{}", r);
    }

    #[test]
    fn test_authalic_roundtrip() {
        for deg in [-89.0, -60.0, -30.0, -1.0, 0.5, 15.0, 45.0, 75.0, 89.9] {
            let phi = f64::to_radians(deg);
            let back = geodetic_from_authalic(authalic_from_geodetic(phi));
            assert!((back - phi).abs() < 1e-9, "{} -> {}", deg, back.to_degrees());
        }
    }
}
