//! A5 pentagonal cells.
//!
//! Cells come from the `a5` crate by default; hosts may swap in another
//! [`PointIndexBackend`]. A5 has no extent query, so the viewport is sampled
//! on a strided lattice (35°, 18°, 10°, 5° for resolutions 0–3, halving
//! from there) and the cell under every sample is collected.
//!
//! Ids are the lowercase hex form of the 64-bit cell index.

use std::fmt;
use std::sync::Arc;

use a5::LonLat;
use geo::{Coord, Polygon};

use super::{check_resolution, checked_point, CellId, DggsAdapter, DggsError, SampleGrid, Strategy};
use crate::family::DggsFamily;
use crate::geometry::{normalize_lon, ring_to_polygon};

/// `point → cell` library interface.
pub trait PointIndexBackend: Send + Sync {
    /// Cell containing a WGS84 point.
    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError>;

    /// Boundary vertices of a cell (open or closed ring).
    fn cell_boundary(&self, id: &CellId) -> Result<Vec<Coord<f64>>, DggsError>;

    /// Resolution of a cell.
    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError>;
}

/// Point index backed by the `a5` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct A5Index;

impl A5Index {
    fn parse(id: &CellId) -> Result<u64, DggsError> {
        match a5::hex_to_u64(id.as_str()) {
            Ok(cell) if cell != a5::WORLD_CELL => Ok(cell),
            _ => Err(DggsError::InvalidCell(id.to_string())),
        }
    }
}

impl PointIndexBackend for A5Index {
    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError> {
        let cell = a5::lonlat_to_cell(LonLat::new(point.x, point.y), resolution as i32).map_err(DggsError::Backend)?;
        Ok(CellId::new(a5::u64_to_hex(cell)))
    }

    fn cell_boundary(&self, id: &CellId) -> Result<Vec<Coord<f64>>, DggsError> {
        let boundary = a5::cell_to_boundary(Self::parse(id)?, None).map_err(DggsError::Backend)?;
        // The library unwraps seam cells past ±180; fold them back so the
        // antimeridian policy sees an ordinary crossing ring.
        Ok(boundary
            .iter()
            .map(|p| Coord {
                x: normalize_lon(p.longitude()),
                y: p.latitude(),
            })
            .collect())
    }

    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError> {
        u8::try_from(a5::get_resolution(Self::parse(id)?)).map_err(|_| DggsError::InvalidCell(id.to_string()))
    }
}

/// Sampling stride in degrees for a resolution.
pub fn sample_step(resolution: u8) -> f64 {
    match resolution {
        0 => 35.0,
        1 => 18.0,
        2 => 10.0,
        r => 5.0 / 2f64.powi(r as i32 - 3),
    }
}

/// A5 adapter over a point index.
#[derive(Clone)]
pub struct A5Adapter {
    backend: Arc<dyn PointIndexBackend>,
}

impl A5Adapter {
    pub fn new(backend: Arc<dyn PointIndexBackend>) -> Self {
        Self { backend }
    }
}

impl Default for A5Adapter {
    fn default() -> Self {
        Self::new(Arc::new(A5Index))
    }
}

impl fmt::Debug for A5Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("A5Adapter").finish_non_exhaustive()
    }
}

impl DggsAdapter for A5Adapter {
    fn family(&self) -> DggsFamily {
        DggsFamily::A5
    }

    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError> {
        check_resolution(DggsFamily::A5, resolution)?;
        let point = checked_point(point)?;
        self.backend.cell_at(point, resolution)
    }

    fn cell_polygon(&self, id: &CellId) -> Result<Polygon<f64>, DggsError> {
        let ring = self.backend.cell_boundary(id)?;
        if ring.len() < 3 {
            return Err(DggsError::InvalidCell(id.to_string()));
        }
        Ok(ring_to_polygon(ring))
    }

    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError> {
        self.backend.resolution_of(id)
    }

    fn strategy(&self, resolution: u8) -> Strategy<'_> {
        Strategy::Sampled(SampleGrid::strided(sample_step(resolution)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dggs::test_support::assert_centroid_roundtrip;
    use geo::Contains;
    use crate::enumerate::{enumerate, EnumerationContext};
    use crate::geometry::GeoRect;

    /// 10° squares named by their south-west corner.
    struct TenDegreeIndex;

    impl PointIndexBackend for TenDegreeIndex {
        fn cell_at(&self, point: Coord<f64>, _resolution: u8) -> Result<CellId, DggsError> {
            let x = ((point.x / 10.0).floor() as i64).min(17);
            let y = ((point.y / 10.0).floor() as i64).min(8);
            Ok(CellId::new(format!("{}:{}", x, y)))
        }

        fn cell_boundary(&self, id: &CellId) -> Result<Vec<Coord<f64>>, DggsError> {
            let (x, y) = id
                .as_str()
                .split_once(':')
                .ok_or_else(|| DggsError::InvalidCell(id.to_string()))?;
            let x: f64 = x.parse::<f64>().map_err(|e| DggsError::Backend(e.to_string()))? * 10.0;
            let y: f64 = y.parse::<f64>().map_err(|e| DggsError::Backend(e.to_string()))? * 10.0;
            Ok(vec![
                Coord { x, y },
                Coord { x: x + 10.0, y },
                Coord { x: x + 10.0, y: y + 10.0 },
                Coord { x, y: y + 10.0 },
            ])
        }

        fn resolution_of(&self, _id: &CellId) -> Result<u8, DggsError> {
            Ok(2)
        }
    }

    #[test]
    fn test_sample_steps() {
        assert_eq!(sample_step(0), 35.0);
        assert_eq!(sample_step(1), 18.0);
        assert_eq!(sample_step(2), 10.0);
        assert_eq!(sample_step(3), 5.0);
        assert_eq!(sample_step(4), 2.5);
        assert_eq!(sample_step(6), 0.625);
    }

    #[test]
    fn test_library_cells_roundtrip() {
        let adapter = A5Adapter::default();
        let ids: Vec<CellId> = [(2.35, 48.85, 8), (-74.0, 40.7, 10), (151.2, -33.9, 5), (0.0, 0.0, 4)]
            .iter()
            .map(|&(lon, lat, res)| adapter.cell_at(Coord { x: lon, y: lat }, res).unwrap())
            .collect();
        assert_eq!(adapter.resolution_of(&ids[0]).unwrap(), 8);
        assert_eq!(adapter.resolution_of(&ids[1]).unwrap(), 10);
        assert_centroid_roundtrip(&adapter, &ids);
    }

    #[test]
    fn test_library_polygon_contains_centre() {
        let adapter = A5Adapter::default();
        let id = adapter.cell_at(Coord { x: 13.4, y: 52.5 }, 6).unwrap();
        let polygon = adapter.cell_polygon(&id).unwrap();
        assert!(polygon.exterior().0.len() >= 6);
        let centre = a5::cell_to_lonlat(a5::hex_to_u64(id.as_str()).unwrap()).unwrap();
        assert!(polygon.contains(&geo::Point::new(centre.longitude(), centre.latitude())));
    }

    #[test]
    fn test_bad_ids_are_invalid() {
        let adapter = A5Adapter::default();
        for bad in ["zz", "", "0"] {
            assert!(matches!(
                adapter.cell_polygon(&CellId::from(bad)),
                Err(DggsError::InvalidCell(_))
            ));
        }
    }

    #[test]
    fn test_library_sampling_covers_extent() {
        let adapter = A5Adapter::default();
        let extent = GeoRect::new(5.0, 45.0, 15.0, 50.0).unwrap();
        let result = enumerate(&adapter, &EnumerationContext::new(5, extent)).unwrap();
        assert!(result.is_complete());
        assert!(!result.cells.is_empty());
        let centre = adapter.cell_at(Coord { x: 10.0, y: 47.5 }, 5).unwrap();
        assert!(result.ids().any(|id| *id == centre));
        for cell in &result.cells {
            assert!(extent.intersects_polygon(&cell.polygon));
        }
    }

    #[test]
    fn test_sampling_with_injected_backend() {
        let adapter = A5Adapter::new(Arc::new(TenDegreeIndex));
        let extent = GeoRect::new(0.0, 0.0, 30.0, 20.0).unwrap();
        let result = enumerate(&adapter, &EnumerationContext::new(2, extent)).unwrap();
        // 10° stride hits every square from the corner; the far edges add
        // the squares that only touch the extent.
        let ids: Vec<&str> = result.ids().map(|id| id.as_str()).collect();
        assert!(ids.contains(&"0:0"));
        assert!(ids.contains(&"2:1"));
        assert!(ids.contains(&"3:2"));
        assert_eq!(ids.len(), 12);
    }

    #[test]
    fn test_short_boundary_is_rejected() {
        struct Degenerate;
        impl PointIndexBackend for Degenerate {
            fn cell_at(&self, _p: Coord<f64>, _r: u8) -> Result<CellId, DggsError> {
                Ok(CellId::from("x"))
            }
            fn cell_boundary(&self, _id: &CellId) -> Result<Vec<Coord<f64>>, DggsError> {
                Ok(vec![Coord { x: 0.0, y: 0.0 }])
            }
            fn resolution_of(&self, _id: &CellId) -> Result<u8, DggsError> {
                Ok(0)
            }
        }
        let adapter = A5Adapter::new(Arc::new(Degenerate));
        assert!(adapter.cell_polygon(&CellId::from("x")).is_err());
    }
}
