//! Families served by a DGGAL-style zone library: ISEA3H, RTEA4R and
//! DGGAL's rHEALPix.
//!
//! The library sits behind [`DggalBackend`]. One [`DggalRuntime`] is shared
//! by the three adapters and builds its backend on first use; a failed
//! build is remembered and reported as `Unavailable` on every call rather
//! than retried per cell.
//!
//! With the `dggal-native` feature the default runtime opens the DGGAL
//! library itself (`super::dggal_native`). Without it the builtin backend
//! answers rHEALPix queries with the kernel in [`super::rhealpix`], and
//! ISEA3H and RTEA4R need a backend injected by the host.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use geo::{Coord, Polygon};

use super::rhealpix::{RhealpixAdapter, RhpCell};
use super::{check_resolution, checked_point, lattice_points, CellId, DggsAdapter, DggsError, ExtentLister, Strategy};
use crate::family::DggsFamily;
use crate::geometry::GeoRect;

/// Grids a zone library may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DggalGrid {
    Isea3h,
    Rtea4r,
    Rhealpix,
}

impl DggalGrid {
    /// Grid served for a family, `None` for non-DGGAL families.
    pub fn for_family(family: DggsFamily) -> Option<Self> {
        match family {
            DggsFamily::Isea3h => Some(DggalGrid::Isea3h),
            DggsFamily::Rtea4r => Some(DggalGrid::Rtea4r),
            DggsFamily::DggalRhealpix => Some(DggalGrid::Rhealpix),
            _ => None,
        }
    }

    pub fn family(&self) -> DggsFamily {
        match self {
            DggalGrid::Isea3h => DggsFamily::Isea3h,
            DggalGrid::Rtea4r => DggsFamily::Rtea4r,
            DggalGrid::Rhealpix => DggsFamily::DggalRhealpix,
        }
    }
}

impl fmt::Display for DggalGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DggalGrid::Isea3h => "ISEA3H",
            DggalGrid::Rtea4r => "RTEA4R",
            DggalGrid::Rhealpix => "rHEALPix",
        };
        f.write_str(name)
    }
}

/// Zone queries of a DGGAL-style library.
pub trait DggalBackend: Send + Sync {
    /// Whether the backend can serve `grid`.
    fn supports(&self, grid: DggalGrid) -> bool;

    /// Zones at `level` touching `extent`, at most `limit` of them.
    fn list_zones(&self, grid: DggalGrid, level: u8, extent: &GeoRect, limit: usize) -> Result<Vec<CellId>, DggsError>;

    /// Zone containing a WGS84 point.
    fn zone_at(&self, grid: DggalGrid, point: Coord<f64>, level: u8) -> Result<CellId, DggsError>;

    /// WGS84 outline of a zone, as the library refines it.
    fn zone_polygon(&self, grid: DggalGrid, zone: &CellId) -> Result<Polygon<f64>, DggsError>;

    /// Level of a zone.
    fn zone_level(&self, grid: DggalGrid, zone: &CellId) -> Result<u8, DggsError>;
}

type BackendFactory = Box<dyn Fn() -> Result<Arc<dyn DggalBackend>, String> + Send + Sync>;

/// Initialize-once holder of the zone library.
pub struct DggalRuntime {
    factory: BackendFactory,
    backend: OnceLock<Result<Arc<dyn DggalBackend>, String>>,
}

impl DggalRuntime {
    /// Runtime that builds its backend with `factory` on first use.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn DggalBackend>, String> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            backend: OnceLock::new(),
        }
    }

    /// Runtime over the builtin rHEALPix-only backend.
    pub fn builtin() -> Self {
        Self::new(|| Ok(Arc::new(BuiltinDggal) as Arc<dyn DggalBackend>))
    }

    /// Runtime over the DGGAL library.
    #[cfg(feature = "dggal-native")]
    pub fn native() -> Self {
        Self::new(|| {
            super::dggal_native::NativeDggal::new().map(|backend| Arc::new(backend) as Arc<dyn DggalBackend>)
        })
    }

    /// Runtime over the best backend compiled in.
    pub fn platform() -> Self {
        #[cfg(feature = "dggal-native")]
        {
            Self::native()
        }
        #[cfg(not(feature = "dggal-native"))]
        {
            Self::builtin()
        }
    }

    /// Runtime over an already constructed backend.
    pub fn with_backend(backend: Arc<dyn DggalBackend>) -> Self {
        Self::new(move || Ok(backend.clone()))
    }

    /// The backend, if it serves `grid`.
    pub fn backend_for(&self, grid: DggalGrid) -> Result<&Arc<dyn DggalBackend>, DggsError> {
        let backend = self
            .backend
            .get_or_init(|| {
                let built = (self.factory)();
                match &built {
                    Ok(_) => tracing::info!("DGGAL: backend initialized"),
                    Err(e) => tracing::warn!(error = %e, "DGGAL: backend initialization failed"),
                }
                built
            })
            .as_ref()
            .map_err(|reason| DggsError::Unavailable {
                family: grid.family(),
                reason: reason.clone(),
            })?;
        if backend.supports(grid) {
            Ok(backend)
        } else {
            Err(DggsError::Unavailable {
                family: grid.family(),
                reason: format!("no {} backend installed", grid),
            })
        }
    }

    /// Whether the backend has been built (successfully or not).
    pub fn is_initialized(&self) -> bool {
        self.backend.get().is_some()
    }
}

impl fmt::Debug for DggalRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DggalRuntime")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// Adapter for one DGGAL grid.
#[derive(Debug, Clone)]
pub struct DggalAdapter {
    grid: DggalGrid,
    runtime: Arc<DggalRuntime>,
}

impl DggalAdapter {
    pub fn new(grid: DggalGrid, runtime: Arc<DggalRuntime>) -> Self {
        Self { grid, runtime }
    }

    pub fn grid(&self) -> DggalGrid {
        self.grid
    }

    /// Fail fast when the backend for this grid is missing.
    pub fn probe(&self) -> Result<(), DggsError> {
        self.runtime.backend_for(self.grid).map(|_| ())
    }

    fn backend(&self) -> Result<&Arc<dyn DggalBackend>, DggsError> {
        self.runtime.backend_for(self.grid)
    }
}

impl DggsAdapter for DggalAdapter {
    fn family(&self) -> DggsFamily {
        self.grid.family()
    }

    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError> {
        check_resolution(self.family(), resolution)?;
        let point = checked_point(point)?;
        self.backend()?.zone_at(self.grid, point, resolution)
    }

    fn cell_polygon(&self, id: &CellId) -> Result<Polygon<f64>, DggsError> {
        self.backend()?.zone_polygon(self.grid, id)
    }

    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError> {
        self.backend()?.zone_level(self.grid, id)
    }

    fn strategy(&self, _resolution: u8) -> Strategy<'_> {
        Strategy::GeoExtentList(self)
    }
}

impl ExtentLister for DggalAdapter {
    fn list_cells(&self, resolution: u8, extent: &GeoRect, limit: usize) -> Result<Vec<CellId>, DggsError> {
        check_resolution(self.family(), resolution)?;
        self.backend()?.list_zones(self.grid, resolution, extent, limit)
    }
}

/// rHEALPix zones from the native kernel.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinDggal;

impl BuiltinDggal {
    fn parse(zone: &CellId) -> Result<RhpCell, DggsError> {
        RhpCell::parse(zone.as_str()).ok_or_else(|| DggsError::InvalidCell(zone.to_string()))
    }

    fn unsupported(grid: DggalGrid) -> DggsError {
        DggsError::Unavailable {
            family: grid.family(),
            reason: "builtin backend serves rHEALPix only".to_string(),
        }
    }
}

impl DggalBackend for BuiltinDggal {
    fn supports(&self, grid: DggalGrid) -> bool {
        grid == DggalGrid::Rhealpix
    }

    fn list_zones(&self, grid: DggalGrid, level: u8, extent: &GeoRect, limit: usize) -> Result<Vec<CellId>, DggsError> {
        if !self.supports(grid) {
            return Err(Self::unsupported(grid));
        }
        // Half a plane cell in degrees keeps every cell sampled at least once.
        let step = 0.5 * 90.0 / 3f64.powi(level as i32);
        let mut seen: HashSet<RhpCell> = HashSet::new();
        let mut zones = Vec::new();
        for point in lattice_points(extent, step) {
            let hit = RhealpixAdapter::locate(point.x, point.y, level);
            let ring = RhealpixAdapter::neighbors_of(&hit);
            for cell in std::iter::once(hit.clone()).chain(ring) {
                if !seen.insert(cell.clone()) {
                    continue;
                }
                if cell == hit || extent.intersects_polygon(&RhealpixAdapter::polygon_of(&cell)) {
                    zones.push(CellId::new(cell.to_string()));
                    if zones.len() >= limit {
                        return Ok(zones);
                    }
                }
            }
        }
        Ok(zones)
    }

    fn zone_at(&self, grid: DggalGrid, point: Coord<f64>, level: u8) -> Result<CellId, DggsError> {
        if !self.supports(grid) {
            return Err(Self::unsupported(grid));
        }
        Ok(CellId::new(RhealpixAdapter::locate(point.x, point.y, level).to_string()))
    }

    fn zone_polygon(&self, grid: DggalGrid, zone: &CellId) -> Result<Polygon<f64>, DggsError> {
        if !self.supports(grid) {
            return Err(Self::unsupported(grid));
        }
        Ok(RhealpixAdapter::polygon_of(&Self::parse(zone)?))
    }

    fn zone_level(&self, grid: DggalGrid, zone: &CellId) -> Result<u8, DggsError> {
        if !self.supports(grid) {
            return Err(Self::unsupported(grid));
        }
        Ok(Self::parse(zone)?.resolution())
    }
}
