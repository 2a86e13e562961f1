//! Geometry primitives.
//!
//! Cells travel through the pipeline as [`geo::Polygon<f64>`] in WGS84
//! (x = longitude, y = latitude). Viewport extents are [`GeoRect`]s, an
//! axis-aligned rectangle in whatever CRS the viewport declares.
//!
//! Rings that wind around a pole cannot be represented as a simple planar
//! polygon in longitude/latitude space. [`ring_to_polygon`] detects them and
//! closes them along the pole line instead, so every polygon handed to the
//! rest of the pipeline is planar-simple.

pub mod antimeridian;

pub use antimeridian::AntimeridianPolicy;

use geo::{Coord, Intersects, LineString, MapCoords, Polygon};

use crate::error::VgridError;

/// Minimum longitude of the WGS84 domain.
pub const MIN_LON: f64 = -180.0;
/// Maximum longitude of the WGS84 domain.
pub const MAX_LON: f64 = 180.0;
/// Minimum latitude of the WGS84 domain.
pub const MIN_LAT: f64 = -90.0;
/// Maximum latitude of the WGS84 domain.
pub const MAX_LAT: f64 = 90.0;

/// Axis-aligned rectangle in a declared CRS.
///
/// Field names follow the geographic case; for projected CRSs `lon` reads
/// as x (easting) and `lat` as y (northing).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoRect {
    /// Minimum x / longitude
    pub min_lon: f64,
    /// Minimum y / latitude
    pub min_lat: f64,
    /// Maximum x / longitude
    pub max_lon: f64,
    /// Maximum y / latitude
    pub max_lat: f64,
}

impl GeoRect {
    /// Create a rectangle, rejecting inverted or non-finite bounds.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, VgridError> {
        let all_finite = [min_lon, min_lat, max_lon, max_lat]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite || min_lon > max_lon || min_lat > max_lat {
            return Err(VgridError::InvalidViewport(format!(
                "inverted or non-finite extent ({}, {}, {}, {})",
                min_lon, min_lat, max_lon, max_lat
            )));
        }
        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    /// The whole WGS84 domain.
    pub const fn world() -> Self {
        Self {
            min_lon: MIN_LON,
            min_lat: MIN_LAT,
            max_lon: MAX_LON,
            max_lat: MAX_LAT,
        }
    }

    /// Bounding box of a set of points, `None` when the set is empty.
    pub fn bounding(points: impl IntoIterator<Item = Coord<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Self {
            min_lon: first.x,
            min_lat: first.y,
            max_lon: first.x,
            max_lat: first.y,
        };
        for c in iter {
            rect.min_lon = rect.min_lon.min(c.x);
            rect.min_lat = rect.min_lat.min(c.y);
            rect.max_lon = rect.max_lon.max(c.x);
            rect.max_lat = rect.max_lat.max(c.y);
        }
        Some(rect)
    }

    /// Width along x.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height along y.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Center point.
    pub fn center(&self) -> Coord<f64> {
        Coord {
            x: (self.min_lon + self.max_lon) / 2.0,
            y: (self.min_lat + self.max_lat) / 2.0,
        }
    }

    /// Whether the rectangle covers the whole WGS84 domain.
    pub fn is_world(&self) -> bool {
        self.min_lon <= MIN_LON
            && self.max_lon >= MAX_LON
            && self.min_lat <= MIN_LAT
            && self.max_lat >= MAX_LAT
    }

    /// Whether either latitude bound reaches a pole.
    pub fn touches_pole(&self) -> bool {
        self.min_lat <= MIN_LAT || self.max_lat >= MAX_LAT
    }

    /// Non-strict point containment.
    pub fn contains_point(&self, c: Coord<f64>) -> bool {
        c.x >= self.min_lon && c.x <= self.max_lon && c.y >= self.min_lat && c.y <= self.max_lat
    }

    /// Clamp to the WGS84 domain (`validate_coordinate` applied to both corners).
    pub fn clamp_to_world(&self) -> Self {
        Self {
            min_lon: self.min_lon.clamp(MIN_LON, MAX_LON),
            min_lat: self.min_lat.clamp(MIN_LAT, MAX_LAT),
            max_lon: self.max_lon.clamp(MIN_LON, MAX_LON),
            max_lat: self.max_lat.clamp(MIN_LAT, MAX_LAT),
        }
    }

    /// Rectangle as a closed polygon.
    pub fn to_polygon(&self) -> Polygon<f64> {
        bbox_polygon(self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }

    /// Non-strict intersection test against a WGS84 polygon.
    ///
    /// Polygons still carrying an antimeridian jump are tested piecewise,
    /// and rings already shifted east of 180° are also tested one turn
    /// west, so a cell is matched where it actually lies.
    pub fn intersects_polygon(&self, polygon: &Polygon<f64>) -> bool {
        let rect = self.to_polygon();
        if antimeridian::crosses_antimeridian(polygon) {
            return antimeridian::split(polygon)
                .iter()
                .any(|piece| piece.intersects(&rect));
        }
        if polygon.intersects(&rect) {
            return true;
        }
        let east_of_seam = polygon.exterior().coords().any(|c| c.x > MAX_LON);
        east_of_seam && polygon.map_coords(|c| Coord { x: c.x - 360.0, y: c.y }).intersects(&rect)
    }
}

impl std::fmt::Display for GeoRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.6}, {:.6}, {:.6}, {:.6})",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// Clamp a coordinate into the WGS84 domain.
///
/// Finite values are clamped to `[-180, 180] × [-90, 90]`; non-finite values
/// cannot be clamped meaningfully and fail with `InvalidCoordinate`.
pub fn validate_coordinate(lon: f64, lat: f64) -> Result<Coord<f64>, VgridError> {
    if !lon.is_finite() || !lat.is_finite() {
        return Err(VgridError::InvalidCoordinate { lon, lat });
    }
    Ok(Coord {
        x: lon.clamp(MIN_LON, MAX_LON),
        y: lat.clamp(MIN_LAT, MAX_LAT),
    })
}

/// Axis-aligned polygon from bounds.
pub fn bbox_polygon(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            (min_lon, min_lat),
            (max_lon, min_lat),
            (max_lon, max_lat),
            (min_lon, max_lat),
            (min_lon, min_lat),
        ]),
        vec![],
    )
}

/// Points along the segment `a → b`, excluding `b`.
pub fn densify(a: Coord<f64>, b: Coord<f64>, segments: usize) -> impl Iterator<Item = Coord<f64>> {
    let n = segments.max(1);
    (0..n).map(move |i| {
        let t = i as f64 / n as f64;
        Coord {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
        }
    })
}

/// Longitude span of the exterior ring.
pub fn lon_span(polygon: &Polygon<f64>) -> f64 {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for c in polygon.exterior().coords() {
        min = min.min(c.x);
        max = max.max(c.x);
    }
    if min.is_finite() {
        max - min
    } else {
        0.0
    }
}

/// Sum of the longitude steps around a ring, each step wrapped to (-180, 180].
///
/// ±360 means the ring winds around a pole; 0 means it does not.
fn winding_longitude(points: &[Coord<f64>]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        let mut d = b.x - a.x;
        while d > 180.0 {
            d -= 360.0;
        }
        while d <= -180.0 {
            d += 360.0;
        }
        total += d;
    }
    total
}

/// Build a polygon from a ring of WGS84 vertices.
///
/// A ring winding around a pole is closed along the pole line
/// (`lon` from 180 back to -180 at `lat = ±90`), giving a simple planar
/// polygon that covers the cap. Other rings are returned as-is, including
/// seam-crossing ones; those are the antimeridian policy's business.
///
/// A closed cap spans the full 360° of longitude, so it is exempt from the
/// narrow-piece guarantee of [`antimeridian::split`].
pub fn ring_to_polygon(points: Vec<Coord<f64>>) -> Polygon<f64> {
    let mut points = points;
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if winding_longitude(&points).abs() > 180.0 {
        return polar_cap_polygon(points);
    }
    Polygon::new(LineString::from(points), vec![])
}

fn polar_cap_polygon(points: Vec<Coord<f64>>) -> Polygon<f64> {
    let mean_lat = points.iter().map(|c| c.y).sum::<f64>() / points.len() as f64;
    let pole = if mean_lat >= 0.0 { MAX_LAT } else { MIN_LAT };

    let mut sorted: Vec<Coord<f64>> = points
        .into_iter()
        .map(|c| Coord {
            x: normalize_lon(c.x),
            y: c.y,
        })
        .collect();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x));
    sorted.dedup_by(|a, b| (a.x - b.x).abs() < 1e-12 && (a.y - b.y).abs() < 1e-12);

    let first = sorted[0];
    let last = sorted[sorted.len() - 1];
    let gap = first.x + 360.0 - last.x;
    let seam_lat = if gap > 1e-12 {
        last.y + (first.y - last.y) * (MAX_LON - last.x) / gap
    } else {
        last.y
    };

    let mut ring = Vec::with_capacity(sorted.len() + 4);
    if first.x > MIN_LON {
        ring.push(Coord {
            x: MIN_LON,
            y: seam_lat,
        });
    }
    ring.extend(sorted.iter().copied());
    if last.x < MAX_LON {
        ring.push(Coord {
            x: MAX_LON,
            y: seam_lat,
        });
    }
    ring.push(Coord {
        x: MAX_LON,
        y: pole,
    });
    ring.push(Coord {
        x: MIN_LON,
        y: pole,
    });
    // Southern caps read clockwise in this order; reverse for a consistent winding.
    if pole < 0.0 {
        ring.reverse();
    }
    Polygon::new(LineString::from(ring), vec![])
}

/// Wrap a longitude into [-180, 180].
pub fn normalize_lon(lon: f64) -> f64 {
    if (MIN_LON..=MAX_LON).contains(&lon) {
        return lon;
    }
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == MIN_LON && lon > 0.0 {
        MAX_LON
    } else {
        wrapped
    }
}

/// Whether a polygon was closed along a pole line by [`ring_to_polygon`].
pub fn is_polar_cap(polygon: &Polygon<f64>) -> bool {
    let coords: Vec<_> = polygon.exterior().coords().collect();
    coords.windows(2).any(|w| {
        (w[0].y.abs() - MAX_LAT).abs() < 1e-9
            && (w[1].y.abs() - MAX_LAT).abs() < 1e-9
            && (w[0].x - w[1].x).abs() >= 359.999
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_rejects_inverted_bounds() {
        assert!(GeoRect::new(10.0, 0.0, 5.0, 1.0).is_err());
        assert!(GeoRect::new(0.0, f64::NAN, 1.0, 1.0).is_err());
        assert!(GeoRect::new(0.0, 0.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn test_clamp_to_world() {
        let rect = GeoRect::new(-200.0, -95.0, 30.0, 100.0).unwrap();
        let clamped = rect.clamp_to_world();
        assert_eq!(clamped.min_lon, -180.0);
        assert_eq!(clamped.min_lat, -90.0);
        assert_eq!(clamped.max_lon, 30.0);
        assert_eq!(clamped.max_lat, 90.0);
        assert!(clamped.touches_pole());
    }

    #[test]
    fn test_validate_coordinate_clamps_and_rejects_nan() {
        let c = validate_coordinate(190.0, -91.0).unwrap();
        assert_eq!((c.x, c.y), (180.0, -90.0));
        assert!(matches!(
            validate_coordinate(f64::NAN, 0.0),
            Err(VgridError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_touching_polygon_intersects() {
        let rect = GeoRect::new(0.0, 0.0, 10.0, 10.0).unwrap();
        let touching = bbox_polygon(10.0, 0.0, 20.0, 10.0);
        let apart = bbox_polygon(10.5, 0.0, 20.0, 10.0);
        assert!(rect.intersects_polygon(&touching));
        assert!(!rect.intersects_polygon(&apart));
    }

    #[test]
    fn test_shifted_polygon_matches_west_of_seam() {
        let rect = GeoRect::new(-180.0, 0.0, -179.0, 1.0).unwrap();
        let shifted = bbox_polygon(179.5, 0.0, 180.5, 1.0);
        assert!(rect.intersects_polygon(&shifted));
    }

    #[test]
    fn test_ring_to_polygon_closes_north_cap() {
        let ring: Vec<Coord<f64>> = (0..12)
            .map(|i| Coord {
                x: -180.0 + 30.0 * i as f64 + 15.0,
                y: 70.0,
            })
            .collect();
        let poly = ring_to_polygon(ring);
        assert!(is_polar_cap(&poly));
        let max_lat = poly
            .exterior()
            .coords()
            .map(|c| c.y)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(max_lat, 90.0);
        assert!(poly.exterior().coords().all(|c| c.x >= -180.0 && c.x <= 180.0));
    }

    #[test]
    fn test_ring_to_polygon_keeps_ordinary_ring() {
        let ring = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 1.0, y: 1.0 },
        ];
        let poly = ring_to_polygon(ring);
        assert!(!is_polar_cap(&poly));
        assert_eq!(poly.exterior().coords().count(), 4);
    }

    #[test]
    fn test_normalize_lon() {
        assert_eq!(normalize_lon(190.0), -170.0);
        assert_eq!(normalize_lon(-190.0), 170.0);
        assert_eq!(normalize_lon(180.0), 180.0);
        assert_eq!(normalize_lon(540.0), 180.0);
    }

    #[test]
    fn test_bounding_rect() {
        let rect = GeoRect::bounding(vec![
            Coord { x: 3.0, y: -1.0 },
            Coord { x: -2.0, y: 4.0 },
        ])
        .unwrap();
        assert_eq!(rect, GeoRect::new(-2.0, -1.0, 3.0, 4.0).unwrap());
        assert!(GeoRect::bounding(Vec::new()).is_none());
    }
}
