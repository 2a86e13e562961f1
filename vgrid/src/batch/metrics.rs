//! Per-cell attributes written by the batch generator.
//!
//! Near-equal-area grids are measured geodesically on WGS84. Lat-lon
//! rectangle grids (geohash, GARS, Maidenhead, ...) additionally report the
//! ground width and height of the rectangle.

use geo::{Centroid, GeodesicArea, GeodesicDistance, Point, Polygon};
use serde::Serialize;

use crate::family::MetricKind;
use crate::geometry::antimeridian::shift_east;
use crate::geometry::{normalize_lon, GeoRect};

/// Measured attributes of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellMetrics {
    pub center_lat: f64,
    pub center_lon: f64,
    /// Perimeter divided by the number of edges.
    pub avg_edge_len_m: f64,
    pub area_m2: f64,
    pub perimeter_m: f64,
    /// Ground width along the center parallel (rectangle grids only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_width_m: Option<f64>,
    /// Ground height along the center meridian (rectangle grids only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_height_m: Option<f64>,
}

/// Measure a cell polygon as produced by its adapter.
///
/// Seam-crossing rings are shifted east before measuring; the reported
/// center longitude is wrapped back into [-180, 180].
pub fn measure(polygon: &Polygon<f64>, kind: MetricKind) -> Option<CellMetrics> {
    let ring = shift_east(polygon);
    let center = ring.centroid()?;
    let edges = ring.exterior().0.len().saturating_sub(1).max(1);
    let area_m2 = ring.geodesic_area_unsigned();
    let perimeter_m = ring.geodesic_perimeter();

    let (cell_width_m, cell_height_m) = match kind {
        MetricKind::Geodesic => (None, None),
        MetricKind::Graticule => {
            let bounds = GeoRect::bounding(ring.exterior().coords().copied())?;
            let mid_lat = center.y();
            let width = Point::new(bounds.min_lon, mid_lat).geodesic_distance(&Point::new(bounds.max_lon, mid_lat));
            let mid_lon = center.x();
            let height = Point::new(mid_lon, bounds.min_lat).geodesic_distance(&Point::new(mid_lon, bounds.max_lat));
            (Some(width), Some(height))
        }
    };

    Some(CellMetrics {
        center_lat: center.y(),
        center_lon: normalize_lon(center.x()),
        avg_edge_len_m: perimeter_m / edges as f64,
        area_m2,
        perimeter_m,
        cell_width_m,
        cell_height_m,
    })
}
