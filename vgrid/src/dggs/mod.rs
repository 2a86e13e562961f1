//! DGGS adapters.
//!
//! Each supported family is one [`DggsAdapter`] implementation. An adapter
//! knows how to locate the cell under a point, turn a cell id into a WGS84
//! polygon and, through [`DggsAdapter::strategy`], which enumeration kernel
//! to drive at a given resolution. The kernels themselves live in
//! [`crate::enumerate`] and are shared by every family.
//!
//! # Strategy seams
//!
//! | Kernel            | Adapter provides                       |
//! |-------------------|----------------------------------------|
//! | `GeoExtentList`   | [`ExtentLister::list_cells`]           |
//! | `PrefixRefine`    | [`PrefixHierarchy`] roots and children |
//! | `BfsFromSeed`     | [`NeighborTopology::neighbors`]        |
//! | `Sampled`         | a [`SampleGrid`] lattice               |
//!
//! Adapters are constructed through [`registry::build_adapter`].

pub mod a5;
pub mod dggal;
#[cfg(feature = "dggal-native")]
pub mod dggal_native;
pub mod digipin;
pub mod ease;
pub mod gars;
pub mod geohash;
pub mod h3;
pub mod maidenhead;
pub mod mgrs;
pub mod olc;
pub mod qtm;
pub mod registry;
pub mod rhealpix;
pub mod s2;
pub mod tilecode;

use std::fmt;

use geo::{Coord, Polygon};
use thiserror::Error;

use crate::family::DggsFamily;
use crate::geometry::GeoRect;

pub use registry::{build_adapter, AdapterContext};

/// Opaque cell identifier; its encoding belongs to the owning family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(String);

impl CellId {
    /// Wrap an id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the id text.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the id is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CellId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CellId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A cell id with its WGS84 footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub id: CellId,
    pub polygon: Polygon<f64>,
}

/// Errors raised by DGGS adapters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DggsError {
    /// The id does not decode under this family.
    #[error("Invalid cell id '{0}'")]
    InvalidCell(String),

    /// The point lies outside the family's coverage.
    #[error("Point ({lon}, {lat}) outside grid coverage")]
    OutOfBounds { lon: f64, lat: f64 },

    /// Resolution outside the family's range.
    #[error("{family} has no resolution {resolution}")]
    InvalidResolution { family: DggsFamily, resolution: u8 },

    /// The family's backing library is not available.
    #[error("{family} unavailable: {reason}")]
    Unavailable { family: DggsFamily, reason: String },

    /// The backing library reported an error.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Lists every cell of a resolution inside a WGS84 rectangle.
pub trait ExtentLister {
    /// Cells at `resolution` touching `extent`, in library order.
    ///
    /// Implementations may stop after `limit` ids; the caller treats a
    /// result longer than its budget as truncated.
    fn list_cells(&self, resolution: u8, extent: &GeoRect, limit: usize) -> Result<Vec<CellId>, DggsError>;
}

/// A textual code hierarchy with a fixed child alphabet.
pub trait PrefixHierarchy {
    /// Root codes in lexicographic order.
    fn roots(&self) -> Vec<CellId>;

    /// Children of a code in lexicographic order.
    fn children(&self, id: &CellId) -> Result<Vec<CellId>, DggsError>;
}

/// Edge/vertex adjacency between cells of one resolution.
pub trait NeighborTopology {
    /// Cells sharing an edge or vertex with `id`.
    fn neighbors(&self, id: &CellId) -> Result<Vec<CellId>, DggsError>;
}

/// Where sample lattices start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleAlign {
    /// Stride from the extent's south-west corner.
    Extent,
    /// Sample cell centers of a rectangular grid anchored at `origin`.
    Grid { origin: Coord<f64> },
}

/// Point lattice for families enumerated by `point → cell` sampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleGrid {
    pub lon_step: f64,
    pub lat_step: f64,
    pub align: SampleAlign,
}

impl SampleGrid {
    /// Square lattice strided from the extent corner.
    pub fn strided(step: f64) -> Self {
        Self {
            lon_step: step,
            lat_step: step,
            align: SampleAlign::Extent,
        }
    }

    /// Cell-center lattice of a rectangular grid.
    pub fn grid(lon_step: f64, lat_step: f64, origin: Coord<f64>) -> Self {
        Self {
            lon_step,
            lat_step,
            align: SampleAlign::Grid { origin },
        }
    }
}

/// Enumeration kernel an adapter asks for at one resolution.
pub enum Strategy<'a> {
    GeoExtentList(&'a dyn ExtentLister),
    PrefixRefine(&'a dyn PrefixHierarchy),
    BfsFromSeed(&'a dyn NeighborTopology),
    Sampled(SampleGrid),
}

impl Strategy<'_> {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::GeoExtentList(_) => "geo-extent-list",
            Strategy::PrefixRefine(_) => "prefix-refine",
            Strategy::BfsFromSeed(_) => "bfs-from-seed",
            Strategy::Sampled(_) => "sampled",
        }
    }
}

/// Uniform interface over one DGGS family.
pub trait DggsAdapter: Send + Sync {
    /// Family this adapter serves.
    fn family(&self) -> DggsFamily;

    /// Cell containing a WGS84 point at `resolution`.
    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError>;

    /// WGS84 footprint of a cell.
    fn cell_polygon(&self, id: &CellId) -> Result<Polygon<f64>, DggsError>;

    /// Resolution encoded in a cell id.
    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError>;

    /// Enumeration kernel for `resolution`.
    fn strategy(&self, resolution: u8) -> Strategy<'_>;

    /// Every cell of a coarse resolution, when the family can list them
    /// without an extent query.
    fn world_cells(&self, _resolution: u8) -> Option<Vec<CellId>> {
        None
    }

    /// Resolve a cell id into id + polygon.
    fn cell(&self, id: CellId) -> Result<Cell, DggsError> {
        let polygon = self.cell_polygon(&id)?;
        Ok(Cell { id, polygon })
    }
}

impl<T: DggsAdapter + ?Sized> DggsAdapter for Box<T> {
    fn family(&self) -> DggsFamily {
        (**self).family()
    }

    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError> {
        (**self).cell_at(point, resolution)
    }

    fn cell_polygon(&self, id: &CellId) -> Result<Polygon<f64>, DggsError> {
        (**self).cell_polygon(id)
    }

    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError> {
        (**self).resolution_of(id)
    }

    fn strategy(&self, resolution: u8) -> Strategy<'_> {
        (**self).strategy(resolution)
    }

    fn world_cells(&self, resolution: u8) -> Option<Vec<CellId>> {
        (**self).world_cells(resolution)
    }
}

/// Reject resolutions outside a family's descriptor range.
pub(crate) fn check_resolution(family: DggsFamily, resolution: u8) -> Result<(), DggsError> {
    if family.descriptor().supports(resolution) {
        Ok(())
    } else {
        Err(DggsError::InvalidResolution { family, resolution })
    }
}

/// Reject non-finite points; clamp the rest into WGS84.
pub(crate) fn checked_point(point: Coord<f64>) -> Result<Coord<f64>, DggsError> {
    crate::geometry::validate_coordinate(point.x, point.y).map_err(|_| DggsError::OutOfBounds {
        lon: point.x,
        lat: point.y,
    })
}

/// Sample points covering `extent` at least every `step` degrees of ground
/// distance, row by row from the south-west. Longitude steps widen with
/// latitude; both edges of the extent are always included.
///
/// Lazy, so callers bounded by a cell budget never materialize the lattice
/// of a large extent.
pub(crate) fn lattice_points(extent: &GeoRect, step: f64) -> impl Iterator<Item = Coord<f64>> {
    let extent = *extent;
    let valid = step.is_finite() && step > 0.0;
    let mut next = valid.then_some(Coord {
        x: extent.min_lon,
        y: extent.min_lat,
    });
    std::iter::from_fn(move || {
        let current = next?;
        next = if current.x < extent.max_lon {
            let lon_step = step / current.y.to_radians().cos().abs().max(0.05);
            Some(Coord {
                x: (current.x + lon_step).min(extent.max_lon),
                y: current.y,
            })
        } else if current.y < extent.max_lat {
            Some(Coord {
                x: extent.min_lon,
                y: (current.y + step).min(extent.max_lat),
            })
        } else {
            None
        };
        Some(current)
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared assertions for adapter tests.

    use super::*;
    use geo::Centroid;

    /// The centroid of each cell's polygon maps back to the cell.
    pub fn assert_centroid_roundtrip<A: DggsAdapter + ?Sized>(adapter: &A, ids: &[CellId]) {
        for id in ids {
            let polygon = adapter.cell_polygon(id).unwrap();
            let centroid = polygon.centroid().unwrap();
            let resolution = adapter.resolution_of(id).unwrap();
            let back = adapter.cell_at(centroid.into(), resolution).unwrap();
            assert_eq!(&back, id, "centroid of {} maps to {}", id, back);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_id_ordering_and_display() {
        let mut ids = vec![CellId::from("wb"), CellId::from("w0"), CellId::from("w")];
        ids.sort();
        assert_eq!(ids, vec![CellId::from("w"), CellId::from("w0"), CellId::from("wb")]);
        assert_eq!(CellId::new("8a2a").to_string(), "8a2a");
        assert_eq!(CellId::new("abc").len(), 3);
    }

    #[test]
    fn test_lattice_includes_corners() {
        let extent = GeoRect::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let points: Vec<_> = lattice_points(&extent, 0.3).collect();
        assert_eq!(points.first(), Some(&Coord { x: 0.0, y: 0.0 }));
        assert_eq!(points.last(), Some(&Coord { x: 1.0, y: 1.0 }));
        assert_eq!(lattice_points(&extent, 0.0).count(), 0);
    }

    #[test]
    fn test_check_resolution() {
        assert!(check_resolution(DggsFamily::Geohash, 1).is_ok());
        assert!(matches!(
            check_resolution(DggsFamily::Geohash, 0),
            Err(DggsError::InvalidResolution { .. })
        ));
    }
}
