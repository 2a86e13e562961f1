//! Native rHEALPix (WGS84 ellipsoid, `N_side = 3`, both polar squares at 0).
//!
//! Geodetic latitudes go through the authalic latitude onto the unit
//! sphere, then through the [`layout`] plane. Cell ids are the face letter
//! followed by one digit `0`–`8` per level.
//!
//! Coarse levels are listed outright; finer ones are explored breadth-first
//! from a seed. Neighbours are found by stepping just outside each edge
//! midpoint and corner on the sphere and locating the point, which also
//! crosses between polar and equatorial faces.

pub mod layout;

use geo::{Coord, Polygon};

use super::{check_resolution, checked_point, CellId, DggsAdapter, DggsError, NeighborTopology, Strategy};
use crate::family::DggsFamily;
use crate::geometry::{densify, ring_to_polygon};
use crate::projection::ellipsoid::{authalic_from_geodetic, geodetic_from_authalic};

pub use layout::RhpCell;

/// Largest level served by [`DggsAdapter::world_cells`].
const WORLD_LISTING_MAX: u8 = 2;
/// Outward step past the boundary, relative to the center distance.
const NEIGHBOR_STEP: f64 = 0.05;

/// Native rHEALPix cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct RhealpixAdapter;

fn xyz(lam: f64, beta: f64) -> [f64; 3] {
    [beta.cos() * lam.cos(), beta.cos() * lam.sin(), beta.sin()]
}

fn lam_beta(p: [f64; 3]) -> (f64, f64) {
    let [x, y, z] = p;
    (y.atan2(x), z.atan2(x.hypot(y)))
}

impl RhealpixAdapter {
    pub fn new() -> Self {
        Self
    }

    fn parse(id: &CellId) -> Result<RhpCell, DggsError> {
        let cell = RhpCell::parse(id.as_str()).ok_or_else(|| DggsError::InvalidCell(id.to_string()))?;
        check_resolution(DggsFamily::Rhealpix, cell.resolution())?;
        Ok(cell)
    }

    fn edge_segments(resolution: u8) -> usize {
        match resolution {
            0 => 12,
            1 => 6,
            2 => 4,
            3 | 4 => 2,
            _ => 1,
        }
    }

    /// Cell containing a point given in longitude / authalic latitude.
    pub fn locate_authalic(lam: f64, beta: f64, resolution: u8) -> RhpCell {
        let (x, y) = layout::forward(lam, beta);
        RhpCell::from_plane(x, y, resolution)
    }

    /// Cell containing a WGS84 point.
    pub fn locate(lon: f64, lat: f64, resolution: u8) -> RhpCell {
        Self::locate_authalic(lon.to_radians(), authalic_from_geodetic(lat.to_radians()), resolution)
    }

    /// WGS84 outline of a cell.
    pub fn polygon_of(cell: &RhpCell) -> Polygon<f64> {
        let (x0, y0, side) = cell.plane_square();
        let corners = [
            Coord { x: x0, y: y0 },
            Coord { x: x0 + side, y: y0 },
            Coord { x: x0 + side, y: y0 + side },
            Coord { x: x0, y: y0 + side },
        ];
        let segments = Self::edge_segments(cell.resolution());
        let mut ring = Vec::with_capacity(4 * segments);
        for k in 0..4 {
            for p in densify(corners[k], corners[(k + 1) % 4], segments) {
                let (lam, beta) = layout::inverse(p.x, p.y);
                ring.push(Coord {
                    x: lam.to_degrees(),
                    y: geodetic_from_authalic(beta).to_degrees(),
                });
            }
        }
        ring_to_polygon(ring)
    }

    /// Cells across every edge and corner.
    pub fn neighbors_of(cell: &RhpCell) -> Vec<RhpCell> {
        let (x0, y0, side) = cell.plane_square();
        let (clam, cbeta) = layout::inverse(x0 + side / 2.0, y0 + side / 2.0);
        let center = xyz(clam, cbeta);

        let mut out: Vec<RhpCell> = Vec::with_capacity(8);
        for (u, v) in [(0.0, 0.0), (0.5, 0.0), (1.0, 0.0), (1.0, 0.5), (1.0, 1.0), (0.5, 1.0), (0.0, 1.0), (0.0, 0.5)] {
            let (lam, beta) = layout::inverse(x0 + u * side, y0 + v * side);
            let p = xyz(lam, beta);
            let q = [
                p[0] + (p[0] - center[0]) * NEIGHBOR_STEP,
                p[1] + (p[1] - center[1]) * NEIGHBOR_STEP,
                p[2] + (p[2] - center[2]) * NEIGHBOR_STEP,
            ];
            let (lam, beta) = lam_beta(q);
            let neighbor = Self::locate_authalic(lam, beta, cell.resolution());
            if &neighbor != cell && !out.contains(&neighbor) {
                out.push(neighbor);
            }
        }
        out
    }
}

impl DggsAdapter for RhealpixAdapter {
    fn family(&self) -> DggsFamily {
        DggsFamily::Rhealpix
    }

    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError> {
        check_resolution(DggsFamily::Rhealpix, resolution)?;
        let point = checked_point(point)?;
        Ok(CellId::new(Self::locate(point.x, point.y, resolution).to_string()))
    }

    fn cell_polygon(&self, id: &CellId) -> Result<Polygon<f64>, DggsError> {
        Ok(Self::polygon_of(&Self::parse(id)?))
    }

    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError> {
        Ok(Self::parse(id)?.resolution())
    }

    fn strategy(&self, _resolution: u8) -> Strategy<'_> {
        Strategy::BfsFromSeed(self)
    }

    fn world_cells(&self, resolution: u8) -> Option<Vec<CellId>> {
        (resolution <= WORLD_LISTING_MAX).then(|| {
            RhpCell::all(resolution)
                .into_iter()
                .map(|c| CellId::new(c.to_string()))
                .collect()
        })
    }
}

impl NeighborTopology for RhealpixAdapter {
    fn neighbors(&self, id: &CellId) -> Result<Vec<CellId>, DggsError> {
        let cell = Self::parse(id)?;
        Ok(Self::neighbors_of(&cell)
            .into_iter()
            .map(|c| CellId::new(c.to_string()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dggs::test_support::assert_centroid_roundtrip;
    use crate::enumerate::{bfs_from_seed, EnumerationContext};
    use crate::geometry::{is_polar_cap, GeoRect};

    #[test]
    fn test_known_cells() {
        let adapter = RhealpixAdapter::new();
        let at = |lon: f64, lat: f64, r: u8| adapter.cell_at(Coord { x: lon, y: lat }, r).unwrap().to_string();
        assert_eq!(at(105.0, 15.0, 1), "R0");
        assert_eq!(at(0.0, 90.0, 2), "N44");
        assert_eq!(at(0.0, -90.0, 2), "S44");
        assert_eq!(at(-135.0, 0.0, 0), "O");
        assert_eq!(at(45.0, 0.0, 0), "Q");
    }

    #[test]
    fn test_polar_center_cells_are_caps() {
        let adapter = RhealpixAdapter::new();
        for id in ["N", "N4", "S44"] {
            let polygon = adapter.cell_polygon(&CellId::from(id)).unwrap();
            assert!(is_polar_cap(&polygon), "{}", id);
        }
        let polygon = adapter.cell_polygon(&CellId::from("N0")).unwrap();
        assert!(!is_polar_cap(&polygon));
    }

    #[test]
    fn test_world_listing() {
        let adapter = RhealpixAdapter::new();
        assert_eq!(adapter.world_cells(1).unwrap().len(), 54);
        assert_eq!(adapter.world_cells(2).unwrap().len(), 486);
        assert!(adapter.world_cells(3).is_none());
    }

    #[test]
    fn test_neighbors_are_mutual() {
        for id in ["O40", "P00", "N01", "S87", "R22", "Q44"] {
            let cell = RhpCell::parse(id).unwrap();
            let neighbors = RhealpixAdapter::neighbors_of(&cell);
            assert!(neighbors.len() >= 3, "{} has {:?}", id, neighbors);
            for n in &neighbors {
                assert!(
                    RhealpixAdapter::neighbors_of(n).contains(&cell),
                    "{} -> {} is one-way",
                    id,
                    n
                );
            }
        }
    }

    #[test]
    fn test_bfs_emits_only_intersecting_cells() {
        let adapter = RhealpixAdapter::new();
        let extent = GeoRect::new(100.0, 10.0, 110.0, 20.0).unwrap();
        let ctx = EnumerationContext::new(4, extent);
        let outcome = bfs_from_seed(&adapter, &adapter, &ctx).unwrap();
        let cells = &outcome.enumeration.cells;

        assert!(outcome.enumeration.is_complete());
        assert_eq!(cells[0].id, adapter.cell_at(Coord { x: 105.0, y: 15.0 }, 4).unwrap());
        for cell in cells {
            assert!(extent.intersects_polygon(&cell.polygon), "{}", cell.id);
        }
        let outside = outcome
            .visited
            .iter()
            .filter(|id| !cells.iter().any(|c| &c.id == *id))
            .count();
        assert!(outside > 0);
    }

    #[test]
    fn test_centroid_roundtrip() {
        let adapter = RhealpixAdapter::new();
        let ids: Vec<CellId> = ["O", "P13", "R0", "Q876", "S1234", "N0", "N4", "N44", "O0000000"]
            .iter()
            .map(|s| CellId::from(*s))
            .collect();
        assert_centroid_roundtrip(&adapter, &ids);
    }
}
