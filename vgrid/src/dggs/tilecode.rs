//! Web Mercator tile codes (`z{zoom}x{col}y{row}`).
//!
//! Resolution is the tile zoom. Coverage is the Mercator band; points nearer
//! the poles fall into the top or bottom tile row.

use geo::{Coord, Polygon};

use super::{check_resolution, checked_point, CellId, DggsAdapter, DggsError, ExtentLister, Strategy};
use crate::coord::{self, CoordError, TileCoord, MAX_LAT, MIN_LAT};
use crate::family::DggsFamily;
use crate::geometry::GeoRect;

/// Slippy-map tiles as DGGS cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct TilecodeAdapter;

impl TilecodeAdapter {
    pub fn new() -> Self {
        Self
    }

    fn tile(id: &CellId) -> Result<TileCoord, DggsError> {
        coord::parse_tile_code(id.as_str()).map_err(|_| DggsError::InvalidCell(id.to_string()))
    }
}

fn backend_error(e: CoordError) -> DggsError {
    DggsError::Backend(e.to_string())
}

impl DggsAdapter for TilecodeAdapter {
    fn family(&self) -> DggsFamily {
        DggsFamily::Tilecode
    }

    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError> {
        check_resolution(DggsFamily::Tilecode, resolution)?;
        let point = checked_point(point)?;
        let tile = coord::to_tile_coords(point.y.clamp(MIN_LAT, MAX_LAT), point.x, resolution).map_err(backend_error)?;
        Ok(CellId::new(tile.to_string()))
    }

    fn cell_polygon(&self, id: &CellId) -> Result<Polygon<f64>, DggsError> {
        Ok(coord::tile_bounds(&Self::tile(id)?).to_polygon())
    }

    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError> {
        Ok(Self::tile(id)?.zoom)
    }

    fn strategy(&self, _resolution: u8) -> Strategy<'_> {
        Strategy::GeoExtentList(self)
    }
}

impl ExtentLister for TilecodeAdapter {
    fn list_cells(&self, resolution: u8, extent: &GeoRect, limit: usize) -> Result<Vec<CellId>, DggsError> {
        check_resolution(DggsFamily::Tilecode, resolution)?;
        let tiles = coord::tiles_in_rect(extent, resolution).map_err(backend_error)?;
        Ok(tiles.take(limit).map(|t| CellId::new(t.to_string())).collect())
    }
}
