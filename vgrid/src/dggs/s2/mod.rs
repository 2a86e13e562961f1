//! S2 cells with hex tokens as ids.
//!
//! Cell math lives in [`cell_id`]. Polygons are built by densifying each
//! cell edge in face coordinates, where edges are straight, and projecting
//! the points back to WGS84. A pole lying on a cell corner becomes a short
//! stretch of pole line so the ring stays planar.
//!
//! Extent listing descends the cube from the six faces, pruning every
//! subtree whose (slightly padded) bounds miss the extent.

pub mod cell_id;

use geo::{Coord, Polygon};

use super::{check_resolution, checked_point, CellId, DggsAdapter, DggsError, ExtentLister, Strategy};
use crate::family::DggsFamily;
use crate::geometry::{densify, ring_to_polygon, GeoRect};

pub use cell_id::S2CellId;

const POLE_EPSILON: f64 = 1e-9;

/// S2 cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct S2Adapter;

impl S2Adapter {
    pub fn new() -> Self {
        Self
    }

    fn parse(id: &CellId) -> Result<S2CellId, DggsError> {
        S2CellId::from_token(id.as_str()).ok_or_else(|| DggsError::InvalidCell(id.to_string()))
    }

    fn edge_segments(level: u8) -> usize {
        match level {
            0 => 16,
            1 => 8,
            2 => 4,
            3 => 2,
            _ => 1,
        }
    }

    /// WGS84 outline of a cell.
    pub fn polygon_of(cell: S2CellId) -> Polygon<f64> {
        let face = cell.face();
        let (u, v) = cell.uv_bounds();
        let corners = [
            Coord { x: u[0], y: v[0] },
            Coord { x: u[1], y: v[0] },
            Coord { x: u[1], y: v[1] },
            Coord { x: u[0], y: v[1] },
        ];
        let segments = Self::edge_segments(cell.level());

        let mut ring = Vec::with_capacity(4 * segments);
        for k in 0..4 {
            for p in densify(corners[k], corners[(k + 1) % 4], segments) {
                let (lon, lat) = cell_id::lon_lat_from_xyz(cell_id::xyz_from_face_uv(face, p.x, p.y));
                ring.push(Coord { x: lon, y: lat });
            }
        }
        ring_to_polygon(spread_poles(ring))
    }

    fn cover(
        &self,
        cell: S2CellId,
        level: u8,
        extent: &GeoRect,
        limit: usize,
        out: &mut Vec<CellId>,
    ) {
        if out.len() >= limit {
            return;
        }
        let polygon = Self::polygon_of(cell);
        if cell.level() == level {
            if extent.intersects_polygon(&polygon) {
                out.push(CellId::new(cell.to_token()));
            }
            return;
        }
        if !padded_bounds_overlap(&polygon, extent) {
            return;
        }
        for child in cell.children() {
            self.cover(child, level, extent, limit, out);
        }
    }
}

/// Replace vertices sitting on a pole by two pole points carrying the
/// longitudes of their neighbours.
fn spread_poles(ring: Vec<Coord<f64>>) -> Vec<Coord<f64>> {
    let n = ring.len();
    let mut out = Vec::with_capacity(n + 2);
    for k in 0..n {
        let c = ring[k];
        if 90.0 - c.y.abs() > POLE_EPSILON {
            out.push(c);
            continue;
        }
        let prev = ring[(k + n - 1) % n];
        let next = ring[(k + 1) % n];
        let pole = 90.0_f64.copysign(c.y);
        out.push(Coord { x: prev.x, y: pole });
        out.push(Coord { x: next.x, y: pole });
    }
    out
}

fn padded_bounds_overlap(polygon: &Polygon<f64>, extent: &GeoRect) -> bool {
    let Some(b) = GeoRect::bounding(polygon.exterior().coords().copied()) else {
        return false;
    };
    // Straight segments undercut the curved edges a little.
    let pad = 0.05 * b.width().max(b.height()) + 1e-9;
    b.min_lon - pad <= extent.max_lon
        && b.max_lon + pad >= extent.min_lon
        && b.min_lat - pad <= extent.max_lat
        && b.max_lat + pad >= extent.min_lat
}

impl DggsAdapter for S2Adapter {
    fn family(&self) -> DggsFamily {
        DggsFamily::S2
    }

    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError> {
        check_resolution(DggsFamily::S2, resolution)?;
        let point = checked_point(point)?;
        Ok(CellId::new(S2CellId::from_lon_lat(point.x, point.y, resolution).to_token()))
    }

    fn cell_polygon(&self, id: &CellId) -> Result<Polygon<f64>, DggsError> {
        Ok(Self::polygon_of(Self::parse(id)?))
    }

    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError> {
        Ok(Self::parse(id)?.level())
    }

    fn strategy(&self, _resolution: u8) -> Strategy<'_> {
        Strategy::GeoExtentList(self)
    }
}

impl ExtentLister for S2Adapter {
    fn list_cells(&self, resolution: u8, extent: &GeoRect, limit: usize) -> Result<Vec<CellId>, DggsError> {
        check_resolution(DggsFamily::S2, resolution)?;
        let mut out = Vec::new();
        for face in 0..6 {
            self.cover(S2CellId::from_face(face), resolution, extent, limit, &mut out);
        }
        Ok(out)
    }
}
