//! Types for Web Mercator tile coordinates.

use std::fmt;

use thiserror::Error;

/// Maximum latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.05112878;
/// Minimum latitude representable in Web Mercator.
pub const MIN_LAT: f64 = -85.05112878;
/// Minimum longitude.
pub const MIN_LON: f64 = -180.0;
/// Maximum longitude.
pub const MAX_LON: f64 = 180.0;
/// Minimum zoom level.
pub const MIN_ZOOM: u8 = 0;
/// Maximum zoom level supported by the tile math.
pub const MAX_ZOOM: u8 = 26;

/// Errors raised by tile coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude outside the Web Mercator range.
    #[error("Invalid latitude: {0} (must be between {MIN_LAT} and {MAX_LAT})")]
    InvalidLatitude(f64),
    /// Longitude outside [-180, 180].
    #[error("Invalid longitude: {0} (must be between -180 and 180)")]
    InvalidLongitude(f64),
    /// Zoom level above [`MAX_ZOOM`].
    #[error("Invalid zoom level: {0} (must be between {MIN_ZOOM} and {MAX_ZOOM})")]
    InvalidZoom(u8),
    /// Tile text that is not `z{z}x{x}y{y}`.
    #[error("Invalid tile code: {0}")]
    InvalidCode(String),
}

/// A Web Mercator tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Tile row (Y coordinate, 0 = north)
    pub row: u32,
    /// Tile column (X coordinate, 0 = west)
    pub col: u32,
    /// Zoom level
    pub zoom: u8,
}

impl TileCoord {
    /// Create a tile coordinate.
    pub fn new(row: u32, col: u32, zoom: u8) -> Self {
        Self { row, col, zoom }
    }

    /// Number of tiles along one axis at this zoom.
    pub fn tiles_per_axis(&self) -> u32 {
        1u32 << self.zoom
    }

    /// Whether row and column lie inside the zoom level's grid.
    pub fn is_valid(&self) -> bool {
        self.zoom <= MAX_ZOOM && self.row < self.tiles_per_axis() && self.col < self.tiles_per_axis()
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "z{}x{}y{}", self.zoom, self.col, self.row)
    }
}

/// Iterator over every tile of a row/column window, row-major from north-west.
#[derive(Debug, Clone)]
pub struct TileRangeIterator {
    zoom: u8,
    col_start: u32,
    col_end: u32,
    row_end: u32,
    current_row: u32,
    current_col: u32,
}

impl TileRangeIterator {
    /// Iterate rows `row_start..=row_end` and columns `col_start..=col_end`.
    pub fn new(zoom: u8, row_start: u32, row_end: u32, col_start: u32, col_end: u32) -> Self {
        Self {
            zoom,
            col_start,
            col_end,
            row_end,
            current_row: row_start,
            current_col: col_start,
        }
    }
}

impl Iterator for TileRangeIterator {
    type Item = TileCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row > self.row_end || self.col_start > self.col_end {
            return None;
        }
        let tile = TileCoord {
            row: self.current_row,
            col: self.current_col,
            zoom: self.zoom,
        };
        if self.current_col == self.col_end {
            self.current_col = self.col_start;
            self.current_row += 1;
        } else {
            self.current_col += 1;
        }
        Some(tile)
    }
}
