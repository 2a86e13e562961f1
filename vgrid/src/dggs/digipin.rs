//! DIGIPIN, India Post's 4×4 hierarchical grid.
//!
//! The bounding box 63.5°E–99.5°E × 2.5°N–38.5°N is split into 16 cells per
//! level, labelled from the symbol grid below (north row first). A full
//! address uses ten symbols; codes are accepted with or without the `-`
//! separators of the printed form and emitted without them.

use geo::{Coord, Polygon};

use super::{check_resolution, checked_point, CellId, DggsAdapter, DggsError, SampleGrid, Strategy};
use crate::family::DggsFamily;
use crate::geometry::bbox_polygon;

const GRID: [[u8; 4]; 4] = [
    [b'F', b'C', b'9', b'8'],
    [b'J', b'3', b'2', b'7'],
    [b'K', b'4', b'5', b'6'],
    [b'L', b'M', b'P', b'T'],
];

pub const MIN_LON: f64 = 63.5;
pub const MAX_LON: f64 = 99.5;
pub const MIN_LAT: f64 = 2.5;
pub const MAX_LAT: f64 = 38.5;
pub const MAX_LEVEL: u8 = 10;

/// Cell edge in degrees at a level.
pub fn cell_size(level: u8) -> f64 {
    9.0 * 0.25_f64.powi(level.max(1) as i32 - 1)
}

fn position(symbol: u8) -> Option<(usize, usize)> {
    let symbol = symbol.to_ascii_uppercase();
    GRID.iter().enumerate().find_map(|(row, cols)| {
        cols.iter().position(|c| *c == symbol).map(|col| (row, col))
    })
}

/// Encode a point, or `None` outside the coverage box.
pub fn encode(lon: f64, lat: f64, level: u8) -> Option<String> {
    if !(MIN_LON..=MAX_LON).contains(&lon) || !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return None;
    }
    let (mut min_lon, mut max_lon) = (MIN_LON, MAX_LON);
    let (mut min_lat, mut max_lat) = (MIN_LAT, MAX_LAT);
    let mut code = String::with_capacity(level as usize);

    for _ in 0..level {
        let lat_div = (max_lat - min_lat) / 4.0;
        let lon_div = (max_lon - min_lon) / 4.0;
        let row = (3 - ((lat - min_lat) / lat_div).floor() as i64).clamp(0, 3) as usize;
        let col = (((lon - min_lon) / lon_div).floor() as i64).clamp(0, 3) as usize;
        code.push(GRID[row][col] as char);

        max_lat = min_lat + lat_div * (4 - row) as f64;
        min_lat += lat_div * (3 - row) as f64;
        min_lon += lon_div * col as f64;
        max_lon = min_lon + lon_div;
    }
    Some(code)
}

/// Decode to `(level, west, south, east, north)`.
fn decode(code: &str) -> Result<(u8, f64, f64, f64, f64), DggsError> {
    let symbols: Vec<u8> = code.bytes().filter(|b| *b != b'-').collect();
    if symbols.is_empty() || symbols.len() > MAX_LEVEL as usize {
        return Err(DggsError::InvalidCell(code.to_string()));
    }
    let (mut min_lon, mut max_lon) = (MIN_LON, MAX_LON);
    let (mut min_lat, mut max_lat) = (MIN_LAT, MAX_LAT);
    for symbol in &symbols {
        let (row, col) = position(*symbol).ok_or_else(|| DggsError::InvalidCell(code.to_string()))?;
        let lat_div = (max_lat - min_lat) / 4.0;
        let lon_div = (max_lon - min_lon) / 4.0;
        max_lat = min_lat + lat_div * (4 - row) as f64;
        min_lat += lat_div * (3 - row) as f64;
        min_lon += lon_div * col as f64;
        max_lon = min_lon + lon_div;
    }
    Ok((symbols.len() as u8, min_lon, min_lat, max_lon, max_lat))
}

/// DIGIPIN cells over India.
#[derive(Debug, Default, Clone, Copy)]
pub struct DigipinAdapter;

impl DigipinAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl DggsAdapter for DigipinAdapter {
    fn family(&self) -> DggsFamily {
        DggsFamily::Digipin
    }

    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError> {
        check_resolution(DggsFamily::Digipin, resolution)?;
        let point = checked_point(point)?;
        encode(point.x, point.y, resolution)
            .map(CellId::new)
            .ok_or(DggsError::OutOfBounds {
                lon: point.x,
                lat: point.y,
            })
    }

    fn cell_polygon(&self, id: &CellId) -> Result<Polygon<f64>, DggsError> {
        let (_, west, south, east, north) = decode(id.as_str())?;
        Ok(bbox_polygon(west, south, east, north))
    }

    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError> {
        Ok(decode(id.as_str())?.0)
    }

    fn strategy(&self, resolution: u8) -> Strategy<'_> {
        let step = cell_size(resolution);
        Strategy::Sampled(SampleGrid::grid(step, step, Coord { x: MIN_LON, y: MIN_LAT }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dggs::test_support::assert_centroid_roundtrip;
    use crate::enumerate::{enumerate, EnumerationContext};
    use crate::geometry::GeoRect;

    #[test]
    fn test_first_level_symbols() {
        // North-west corner cell and south-east corner cell.
        assert_eq!(encode(64.0, 38.0, 1).as_deref(), Some("F"));
        assert_eq!(encode(99.0, 3.0, 1).as_deref(), Some("T"));
        assert_eq!(encode(MAX_LON, MAX_LAT, 1).as_deref(), Some("8"));
    }

    #[test]
    fn test_outside_coverage() {
        let adapter = DigipinAdapter::new();
        assert!(matches!(
            adapter.cell_at(Coord { x: 0.0, y: 0.0 }, 4),
            Err(DggsError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_separators_are_ignored() {
        assert_eq!(decode("39J-438-TJC7").unwrap(), decode("39J438TJC7").unwrap());
        assert_eq!(decode("39J-438-TJC7").unwrap().0, 10);
    }

    #[test]
    fn test_invalid_codes() {
        for bad in ["", "A", "39J438TJC7F", "0"] {
            assert!(decode(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_level_two_over_coverage() {
        let extent = GeoRect::new(MIN_LON, MIN_LAT, MAX_LON, MAX_LAT).unwrap();
        let result = enumerate(&DigipinAdapter::new(), &EnumerationContext::new(2, extent)).unwrap();
        assert_eq!(result.cells.len(), 256);
    }

    #[test]
    fn test_extent_outside_coverage_is_empty() {
        let extent = GeoRect::new(-10.0, 40.0, 10.0, 50.0).unwrap();
        let result = enumerate(&DigipinAdapter::new(), &EnumerationContext::new(3, extent)).unwrap();
        assert!(result.cells.is_empty());
        assert_eq!(result.skipped, 0);
    }

    #[test]
    fn test_centroid_roundtrip() {
        let adapter = DigipinAdapter::new();
        let ids: Vec<CellId> = ["F", "T", "39", "39J438", "39J438TJC7", "LMPT"]
            .iter()
            .map(|s| CellId::from(*s))
            .collect();
        assert_centroid_roundtrip(&adapter, &ids);
    }
}
