//! EASE-DGGS on the EASE-Grid 2.0 global projection (EPSG:6933).
//!
//! Level 0 is the 964 × 406 grid of 36 km cells; levels 1–6 refine each
//! parent by 4, 3, 3, 10, 10, 10 per axis, down to roughly 1 m. Ids name
//! the level-0 row and column, then one row/column digit pair per level:
//!
//! ```text
//! L3.165059.21.02.11
//! ```
//!
//! The grid stops short of the poles (about ±85.04°); points beyond are
//! out of coverage.

use geo::{Coord, Polygon};

use super::{check_resolution, checked_point, CellId, DggsAdapter, DggsError, ExtentLister, Strategy};
use crate::family::DggsFamily;
use crate::geometry::{bbox_polygon, GeoRect};
use crate::projection::cea;

/// Level-0 cell size in meters.
pub const LEVEL0_SIZE_M: f64 = 36_032.220_840_584;
pub const LEVEL0_COLS: u64 = 964;
pub const LEVEL0_ROWS: u64 = 406;
/// Per-level refinement ratio, level 1 first.
pub const RATIOS: [u64; 6] = [4, 3, 3, 10, 10, 10];

const GRID_X_MAX: f64 = LEVEL0_SIZE_M * (LEVEL0_COLS / 2) as f64;
const GRID_Y_MAX: f64 = LEVEL0_SIZE_M * (LEVEL0_ROWS / 2) as f64;

/// Cells per level-0 cell edge at `level`.
fn refinement(level: u8) -> u64 {
    RATIOS.iter().take(level as usize).product()
}

/// Cell size in meters at `level`.
pub fn cell_size(level: u8) -> f64 {
    LEVEL0_SIZE_M / refinement(level) as f64
}

/// Global `(row, col)` of a cell at its level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GridCell {
    level: u8,
    row: u64,
    col: u64,
}

impl GridCell {
    fn dims(level: u8) -> (u64, u64) {
        let k = refinement(level);
        (LEVEL0_ROWS * k, LEVEL0_COLS * k)
    }

    /// Cell containing projected `(x, y)`, clamped onto the grid.
    fn from_xy(x: f64, y: f64, level: u8) -> Self {
        let size = cell_size(level);
        let (rows, cols) = Self::dims(level);
        let col = (((x + GRID_X_MAX) / size).floor() as i64).clamp(0, cols as i64 - 1) as u64;
        let row = (((GRID_Y_MAX - y) / size).floor() as i64).clamp(0, rows as i64 - 1) as u64;
        Self { level, row, col }
    }

    fn id(&self) -> String {
        let mut digits = Vec::with_capacity(self.level as usize);
        let (mut row, mut col) = (self.row, self.col);
        for ratio in RATIOS.iter().take(self.level as usize).rev() {
            digits.push(format!("{}{}", row % ratio, col % ratio));
            row /= ratio;
            col /= ratio;
        }
        let mut id = format!("L{}.{:03}{:03}", self.level, row, col);
        for pair in digits.iter().rev() {
            id.push('.');
            id.push_str(pair);
        }
        id
    }

    fn parse(id: &str) -> Option<Self> {
        let mut parts = id.split('.');
        let level: u8 = parts.next()?.strip_prefix('L')?.parse().ok()?;
        if level as usize > RATIOS.len() {
            return None;
        }
        let base = parts.next()?;
        if base.len() != 6 || !base.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let mut row: u64 = base[..3].parse().ok()?;
        let mut col: u64 = base[3..].parse().ok()?;
        if row >= LEVEL0_ROWS || col >= LEVEL0_COLS {
            return None;
        }
        for ratio in RATIOS.iter().take(level as usize) {
            let pair = parts.next()?.as_bytes();
            if pair.len() != 2 {
                return None;
            }
            let r = (pair[0] as char).to_digit(10)? as u64;
            let c = (pair[1] as char).to_digit(10)? as u64;
            if r >= *ratio || c >= *ratio {
                return None;
            }
            row = row * ratio + r;
            col = col * ratio + c;
        }
        if parts.next().is_some() {
            return None;
        }
        Some(Self { level, row, col })
    }

    /// `(x_min, y_min, x_max, y_max)` in EPSG:6933 meters.
    fn bounds(&self) -> (f64, f64, f64, f64) {
        let size = cell_size(self.level);
        let x0 = -GRID_X_MAX + self.col as f64 * size;
        let y1 = GRID_Y_MAX - self.row as f64 * size;
        (x0, y1 - size, x0 + size, y1)
    }
}

/// EASE-DGGS cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct EaseAdapter;

impl EaseAdapter {
    pub fn new() -> Self {
        Self
    }

    fn parse(id: &CellId) -> Result<GridCell, DggsError> {
        GridCell::parse(id.as_str()).ok_or_else(|| DggsError::InvalidCell(id.to_string()))
    }

    fn project(lon: f64, lat: f64) -> Result<(f64, f64), DggsError> {
        cea::forward(lon, lat).map_err(|e| DggsError::Backend(e.to_string()))
    }
}

impl DggsAdapter for EaseAdapter {
    fn family(&self) -> DggsFamily {
        DggsFamily::Ease
    }

    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError> {
        check_resolution(DggsFamily::Ease, resolution)?;
        let point = checked_point(point)?;
        let (x, y) = Self::project(point.x, point.y)?;
        if y.abs() > GRID_Y_MAX {
            return Err(DggsError::OutOfBounds {
                lon: point.x,
                lat: point.y,
            });
        }
        Ok(CellId::new(GridCell::from_xy(x, y, resolution).id()))
    }

    fn cell_polygon(&self, id: &CellId) -> Result<Polygon<f64>, DggsError> {
        let (x0, y0, x1, y1) = Self::parse(id)?.bounds();
        let backend = |e: crate::projection::ProjectionError| DggsError::Backend(e.to_string());
        let (west, south) = cea::inverse(x0, y0).map_err(backend)?;
        let (east, north) = cea::inverse(x1, y1).map_err(backend)?;
        Ok(bbox_polygon(west, south, east, north))
    }

    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError> {
        Ok(Self::parse(id)?.level)
    }

    fn strategy(&self, _resolution: u8) -> Strategy<'_> {
        Strategy::GeoExtentList(self)
    }
}

impl ExtentLister for EaseAdapter {
    fn list_cells(&self, resolution: u8, extent: &GeoRect, limit: usize) -> Result<Vec<CellId>, DggsError> {
        check_resolution(DggsFamily::Ease, resolution)?;
        let extent = extent.clamp_to_world();
        let (x0, y0) = Self::project(extent.min_lon, extent.min_lat)?;
        let (x1, y1) = Self::project(extent.max_lon, extent.max_lat)?;
        if y1 < -GRID_Y_MAX || y0 > GRID_Y_MAX {
            return Ok(Vec::new());
        }
        let north_west = GridCell::from_xy(x0, y1, resolution);
        let south_east = GridCell::from_xy(x1, y0, resolution);

        let mut ids = Vec::new();
        for row in north_west.row..=south_east.row {
            for col in north_west.col..=south_east.col {
                if ids.len() >= limit {
                    return Ok(ids);
                }
                ids.push(CellId::new(GridCell { level: resolution, row, col }.id()));
            }
        }
        Ok(ids)
    }
}
