//! Web Mercator tile math.
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and slippy-map tile coordinates. The Tilecode family is a thin DGGS
//! wrapper around these functions, and the projector uses the spherical
//! forward/inverse pair for EPSG:3857.

mod types;

pub use types::{
    CoordError, TileCoord, TileRangeIterator, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
    MIN_ZOOM,
};

use std::f64::consts::PI;

use crate::geometry::GeoRect;

/// Spherical Web Mercator radius in meters (EPSG:3857).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 26)
///
/// # Returns
///
/// A `Result` containing the tile coordinates or an error if inputs are invalid.
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let n = 2.0_f64.powi(zoom as i32);
    let max_index = (1u32 << zoom) - 1;

    // lon = 180 and lat = MIN_LAT land one past the last tile
    let col = (((lon + 180.0) / 360.0 * n) as u32).min(max_index);
    let lat_rad = lat.to_radians();
    let row = (((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as u32).min(max_index);

    Ok(TileCoord { row, col, zoom })
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);

    let lon = tile.col as f64 / n * 360.0 - 180.0;

    let y = tile.row as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad.to_degrees();

    (lat, lon)
}

/// Geographic bounds of a tile.
pub fn tile_bounds(tile: &TileCoord) -> GeoRect {
    let (north, west) = tile_to_lat_lon(tile);
    let (south, east) = tile_to_lat_lon(&TileCoord {
        row: tile.row + 1,
        col: tile.col + 1,
        zoom: tile.zoom,
    });
    GeoRect {
        min_lon: west,
        min_lat: south,
        max_lon: east,
        max_lat: north,
    }
}

/// Every tile of `zoom` touching a WGS84 rectangle.
///
/// Latitudes are clamped into the Mercator band first, so a rectangle
/// reaching the poles yields the top and bottom tile rows.
pub fn tiles_in_rect(rect: &GeoRect, zoom: u8) -> Result<TileRangeIterator, CoordError> {
    let clamp_lat = |lat: f64| lat.clamp(MIN_LAT, MAX_LAT);
    let clamp_lon = |lon: f64| lon.clamp(MIN_LON, MAX_LON);

    let north_west = to_tile_coords(clamp_lat(rect.max_lat), clamp_lon(rect.min_lon), zoom)?;
    let south_east = to_tile_coords(clamp_lat(rect.min_lat), clamp_lon(rect.max_lon), zoom)?;

    Ok(TileRangeIterator::new(
        zoom,
        north_west.row,
        south_east.row,
        north_west.col,
        south_east.col,
    ))
}

/// Parse a tile code of the form `z{zoom}x{col}y{row}`.
pub fn parse_tile_code(code: &str) -> Result<TileCoord, CoordError> {
    let invalid = || CoordError::InvalidCode(code.to_string());

    let rest = code.strip_prefix('z').ok_or_else(invalid)?;
    let (zoom, rest) = rest.split_once('x').ok_or_else(invalid)?;
    let (col, row) = rest.split_once('y').ok_or_else(invalid)?;

    let tile = TileCoord {
        zoom: zoom.parse().map_err(|_| invalid())?,
        col: col.parse().map_err(|_| invalid())?,
        row: row.parse().map_err(|_| invalid())?,
    };
    if tile.zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(tile.zoom));
    }
    if !tile.is_valid() {
        return Err(invalid());
    }
    Ok(tile)
}

/// Spherical Web Mercator forward projection to meters.
pub fn mercator_forward(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(MIN_LAT, MAX_LAT);
    let x = EARTH_RADIUS_M * lon.to_radians();
    let y = EARTH_RADIUS_M * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Spherical Web Mercator inverse projection from meters.
pub fn mercator_inverse(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}
