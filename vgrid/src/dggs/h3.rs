//! H3 hexagonal cells through [`h3o`].
//!
//! Resolution 0 is served from the 122 base cells, which makes the
//! whole-world view independent of any extent query. Finer resolutions list
//! cells by sampling the extent on a lattice no coarser than one cell edge
//! and growing each hit by one ring, so cells clipped by the extent border
//! are not lost.
//!
//! H3 boundaries come back with raw longitudes; cells straddling the
//! antimeridian are rewritten into a continuous ring (`lon > 180`) before
//! they leave the adapter.

use std::collections::HashSet;

use geo::{Coord, Polygon};
use h3o::{CellIndex, LatLng, Resolution};

use super::{
    check_resolution, checked_point, lattice_points, CellId, DggsAdapter, DggsError, ExtentLister, Strategy,
};
use crate::family::DggsFamily;
use crate::geometry::{antimeridian, ring_to_polygon, GeoRect};

const KM_PER_DEGREE: f64 = 111.32;

/// H3 cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct H3Adapter;

impl H3Adapter {
    pub fn new() -> Self {
        Self
    }

    fn index(id: &CellId) -> Result<CellIndex, DggsError> {
        id.as_str()
            .parse::<CellIndex>()
            .map_err(|_| DggsError::InvalidCell(id.to_string()))
    }

    fn resolution(resolution: u8) -> Result<Resolution, DggsError> {
        check_resolution(DggsFamily::H3, resolution)?;
        Resolution::try_from(resolution).map_err(|e| DggsError::Backend(e.to_string()))
    }

    fn polygon_of(cell: CellIndex) -> Polygon<f64> {
        let ring: Vec<Coord<f64>> = cell
            .boundary()
            .iter()
            .map(|ll| Coord { x: ll.lng(), y: ll.lat() })
            .collect();
        antimeridian::fix_h3(ring_to_polygon(ring))
    }

    fn locate(lon: f64, lat: f64, resolution: Resolution) -> Result<CellIndex, DggsError> {
        let ll = LatLng::new(lat, lon).map_err(|_| DggsError::OutOfBounds { lon, lat })?;
        Ok(ll.to_cell(resolution))
    }
}

impl DggsAdapter for H3Adapter {
    fn family(&self) -> DggsFamily {
        DggsFamily::H3
    }

    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError> {
        let resolution = Self::resolution(resolution)?;
        let point = checked_point(point)?;
        Ok(CellId::new(Self::locate(point.x, point.y, resolution)?.to_string()))
    }

    fn cell_polygon(&self, id: &CellId) -> Result<Polygon<f64>, DggsError> {
        Ok(Self::polygon_of(Self::index(id)?))
    }

    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError> {
        Ok(u8::from(Self::index(id)?.resolution()))
    }

    fn strategy(&self, _resolution: u8) -> Strategy<'_> {
        Strategy::GeoExtentList(self)
    }

    fn world_cells(&self, resolution: u8) -> Option<Vec<CellId>> {
        (resolution == 0).then(|| CellIndex::base_cells().map(|c| CellId::new(c.to_string())).collect())
    }
}

impl ExtentLister for H3Adapter {
    fn list_cells(&self, resolution: u8, extent: &GeoRect, limit: usize) -> Result<Vec<CellId>, DggsError> {
        let res = Self::resolution(resolution)?;
        let step = res.edge_length_km() / KM_PER_DEGREE;

        let mut seen: HashSet<CellIndex> = HashSet::new();
        let mut ids = Vec::new();
        for point in lattice_points(extent, step) {
            let hit = Self::locate(point.x, point.y, res)?;
            for cell in hit.grid_disk::<Vec<_>>(1) {
                if !seen.insert(cell) {
                    continue;
                }
                if cell == hit || extent.intersects_polygon(&Self::polygon_of(cell)) {
                    ids.push(CellId::new(cell.to_string()));
                    if ids.len() >= limit {
                        return Ok(ids);
                    }
                }
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dggs::test_support::assert_centroid_roundtrip;
    use crate::enumerate::{enumerate, EnumerationContext};
    use crate::geometry::lon_span;

    #[test]
    fn test_base_cells_for_world() {
        let adapter = H3Adapter::new();
        let cells = adapter.world_cells(0).unwrap();
        assert_eq!(cells.len(), 122);
        assert!(adapter.world_cells(1).is_none());
    }

    #[test]
    fn test_cell_at_resolution() {
        let adapter = H3Adapter::new();
        let id = adapter.cell_at(Coord { x: 2.3522, y: 48.8566 }, 9).unwrap();
        assert_eq!(adapter.resolution_of(&id).unwrap(), 9);
        assert!(matches!(
            adapter.cell_at(Coord { x: 0.0, y: 0.0 }, 16),
            Err(DggsError::InvalidResolution { .. })
        ));
    }

    #[test]
    fn test_seam_cells_are_continuous() {
        let adapter = H3Adapter::new();
        let id = adapter.cell_at(Coord { x: 179.99, y: 0.0 }, 2).unwrap();
        let polygon = adapter.cell_polygon(&id).unwrap();
        assert!(lon_span(&polygon) < 180.0);
    }

    #[test]
    fn test_extent_listing_covers_every_sample() {
        let adapter = H3Adapter::new();
        let extent = GeoRect::new(2.0, 48.0, 3.0, 49.0).unwrap();
        let result = enumerate(&adapter, &EnumerationContext::new(5, extent)).unwrap();
        assert!(result.is_complete());

        let ids: HashSet<&CellId> = result.ids().collect();
        for (lon, lat) in [(2.0, 48.0), (3.0, 49.0), (2.5, 48.5), (2.99, 48.01)] {
            let id = adapter.cell_at(Coord { x: lon, y: lat }, 5).unwrap();
            assert!(ids.contains(&id), "missing cell at ({}, {})", lon, lat);
        }
    }

    #[test]
    fn test_invalid_ids() {
        let adapter = H3Adapter::new();
        assert!(adapter.cell_polygon(&CellId::from("not-a-cell")).is_err());
        assert!(adapter.resolution_of(&CellId::from("")).is_err());
    }

    #[test]
    fn test_centroid_roundtrip() {
        let adapter = H3Adapter::new();
        let ids: Vec<CellId> = [(2.35, 48.85, 9), (-74.0, 40.7, 5), (139.7, 35.7, 12)]
            .iter()
            .map(|(lon, lat, r)| adapter.cell_at(Coord { x: *lon, y: *lat }, *r).unwrap())
            .collect();
        assert_centroid_roundtrip(&adapter, &ids);
    }
}
