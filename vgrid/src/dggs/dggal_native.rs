//! DGGAL zone library through the `dggal` crate.
//!
//! Compiled with the `dggal-native` feature. [`NativeDggal`] opens one
//! DGGRS instance per grid the library knows and serves ISEA3H, RTEA4R and
//! rHEALPix zones with the library's own text ids. Calls are serialized
//! through a mutex; the library handles are not thread-safe.

use std::sync::{Mutex, MutexGuard};

use dggal::{Application, GeoExtent, GeoPoint, DGGAL, DGGRS};
use geo::{Coord, Polygon};

use super::dggal::{DggalBackend, DggalGrid};
use super::{CellId, DggsError};
use crate::geometry::{ring_to_polygon, GeoRect};

/// Class name of a grid inside the library.
fn dggrs_name(grid: DggalGrid) -> &'static str {
    match grid {
        DggalGrid::Isea3h => "ISEA3H",
        DggalGrid::Rtea4r => "RTEA4R",
        DggalGrid::Rhealpix => "rHEALPix",
    }
}

fn geo_point(lon: f64, lat: f64) -> GeoPoint {
    GeoPoint {
        lat: lat.to_radians(),
        lon: lon.to_radians(),
    }
}

struct Library {
    // Declaration order is drop order: grids, then module, then app.
    grids: Vec<(DggalGrid, DGGRS)>,
    _module: Box<DGGAL>,
    _app: Box<Application>,
}

// SAFETY: the handles are only touched while holding the `NativeDggal`
// mutex, so no two threads use the library at once.
unsafe impl Send for Library {}

impl Library {
    fn dggrs(&self, grid: DggalGrid) -> Result<&DGGRS, DggsError> {
        self.grids
            .iter()
            .find(|(g, _)| *g == grid)
            .map(|(_, dggrs)| dggrs)
            .ok_or_else(|| DggsError::Unavailable {
                family: grid.family(),
                reason: format!("DGGAL has no {} grid", grid),
            })
    }
}

/// Backend over the native DGGAL library.
pub struct NativeDggal {
    library: Mutex<Library>,
}

impl NativeDggal {
    /// Initialize the library and open every supported grid.
    ///
    /// # Errors
    ///
    /// Fails when the library exposes none of the three grids.
    pub fn new() -> Result<Self, String> {
        let app = Box::new(Application::new(&Vec::new()));
        let module = Box::new(DGGAL::new(&app));
        let mut grids = Vec::new();
        for grid in [DggalGrid::Isea3h, DggalGrid::Rtea4r, DggalGrid::Rhealpix] {
            match module.newDGGRS(dggrs_name(grid)) {
                Some(dggrs) => grids.push((grid, dggrs)),
                None => tracing::warn!(grid = %grid, "DGGAL: grid class not found"),
            }
        }
        if grids.is_empty() {
            return Err("DGGAL library provides none of ISEA3H, RTEA4R, rHEALPix".to_string());
        }
        Ok(Self {
            library: Mutex::new(Library {
                grids,
                _module: module,
                _app: app,
            }),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Library>, DggsError> {
        self.library
            .lock()
            .map_err(|_| DggsError::Backend("DGGAL library lock poisoned".to_string()))
    }

    fn zone(dggrs: &DGGRS, id: &CellId) -> Result<u64, DggsError> {
        let zone = dggrs.getZoneFromTextID(id.as_str());
        if zone == dggal::nullZone {
            return Err(DggsError::InvalidCell(id.to_string()));
        }
        Ok(zone)
    }
}

impl DggalBackend for NativeDggal {
    fn supports(&self, grid: DggalGrid) -> bool {
        self.lock().map(|lib| lib.dggrs(grid).is_ok()).unwrap_or(false)
    }

    fn list_zones(&self, grid: DggalGrid, level: u8, extent: &GeoRect, limit: usize) -> Result<Vec<CellId>, DggsError> {
        let lib = self.lock()?;
        let dggrs = lib.dggrs(grid)?;
        let bbox = GeoExtent {
            ll: geo_point(extent.min_lon, extent.min_lat),
            ur: geo_point(extent.max_lon, extent.max_lat),
        };
        Ok(dggrs
            .listZones(level as i32, &bbox)
            .into_iter()
            .take(limit)
            .map(|zone| CellId::new(dggrs.getZoneTextID(zone)))
            .collect())
    }

    fn zone_at(&self, grid: DggalGrid, point: Coord<f64>, level: u8) -> Result<CellId, DggsError> {
        let lib = self.lock()?;
        let dggrs = lib.dggrs(grid)?;
        let zone = dggrs.getZoneFromWGS84Centroid(level as i32, &geo_point(point.x, point.y));
        if zone == dggal::nullZone {
            return Err(DggsError::OutOfBounds {
                lon: point.x,
                lat: point.y,
            });
        }
        Ok(CellId::new(dggrs.getZoneTextID(zone)))
    }

    fn zone_polygon(&self, grid: DggalGrid, zone: &CellId) -> Result<Polygon<f64>, DggsError> {
        let lib = self.lock()?;
        let dggrs = lib.dggrs(grid)?;
        let vertices = dggrs.getZoneRefinedWGS84Vertices(Self::zone(dggrs, zone)?, 0);
        if vertices.len() < 3 {
            return Err(DggsError::InvalidCell(zone.to_string()));
        }
        Ok(ring_to_polygon(
            vertices
                .iter()
                .map(|p| Coord {
                    x: p.lon.to_degrees(),
                    y: p.lat.to_degrees(),
                })
                .collect(),
        ))
    }

    fn zone_level(&self, grid: DggalGrid, zone: &CellId) -> Result<u8, DggsError> {
        let lib = self.lock()?;
        let dggrs = lib.dggrs(grid)?;
        let level = dggrs.getZoneLevel(Self::zone(dggrs, zone)?);
        u8::try_from(level).map_err(|_| DggsError::InvalidCell(zone.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dggs::dggal::{DggalAdapter, DggalRuntime};
    use crate::dggs::test_support::assert_centroid_roundtrip;
    use crate::dggs::DggsAdapter;
    use crate::enumerate::{enumerate, EnumerationContext};
    use std::sync::Arc;

    fn adapter(grid: DggalGrid) -> DggalAdapter {
        DggalAdapter::new(grid, Arc::new(DggalRuntime::native()))
    }

    #[test]
    fn test_native_serves_all_grids() {
        for grid in [DggalGrid::Isea3h, DggalGrid::Rtea4r, DggalGrid::Rhealpix] {
            assert!(adapter(grid).probe().is_ok(), "{} missing", grid);
        }
    }

    #[test]
    fn test_isea3h_zone_roundtrip() {
        let isea3h = adapter(DggalGrid::Isea3h);
        let id = isea3h.cell_at(Coord { x: 2.35, y: 48.85 }, 6).unwrap();
        assert_eq!(isea3h.resolution_of(&id).unwrap(), 6);
        assert_centroid_roundtrip(&isea3h, &[id]);
    }

    #[test]
    fn test_rtea4r_listing_touches_extent() {
        let rtea4r = adapter(DggalGrid::Rtea4r);
        let extent = GeoRect::new(100.0, 10.0, 110.0, 20.0).unwrap();
        let result = enumerate(&rtea4r, &EnumerationContext::new(4, extent)).unwrap();
        assert!(!result.cells.is_empty());
        for cell in &result.cells {
            assert!(extent.intersects_polygon(&cell.polygon));
        }
    }
}
