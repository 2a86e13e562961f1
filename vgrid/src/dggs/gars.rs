//! Global Area Reference System.
//!
//! | Resolution | Cell   | Code            |
//! |------------|--------|-----------------|
//! | 1          | 30′    | `001AA`         |
//! | 2          | 15′    | `001AA1`        |
//! | 3          | 5′     | `001AA19`       |
//! | 4          | 1′     | `001AA1925`     |
//!
//! Longitude bands `001`–`720` run east from −180°, latitude bands `AA`–`QZ`
//! north from −90°. Quadrants are numbered 1 NW, 2 NE, 3 SW, 4 SE; the 5′
//! keypad runs 1–9 from the top-left, and the 1′ index 01–25 likewise.

use geo::{Coord, Polygon};

use super::{check_resolution, checked_point, CellId, DggsAdapter, DggsError, SampleGrid, Strategy};
use crate::family::DggsFamily;
use crate::geometry::bbox_polygon;

/// Latitude band letters (no I, no O).
const LETTERS: &[u8; 24] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
const LON_MINUTES: i64 = 360 * 60;
const LAT_MINUTES: i64 = 180 * 60;

/// Cell size in arc-minutes at a resolution.
pub fn cell_minutes(resolution: u8) -> i64 {
    match resolution {
        0 | 1 => 30,
        2 => 15,
        3 => 5,
        _ => 1,
    }
}

/// Encode a point; `resolution` must be 1–4.
pub fn encode(lon: f64, lat: f64, resolution: u8) -> String {
    let x = (((lon + 180.0) * 60.0).floor() as i64).clamp(0, LON_MINUTES - 1);
    let y = (((lat + 90.0) * 60.0).floor() as i64).clamp(0, LAT_MINUTES - 1);

    let lon_band = x / 30 + 1;
    let lat_band = (y / 30) as usize;
    let mut code = format!(
        "{:03}{}{}",
        lon_band,
        LETTERS[lat_band / 24] as char,
        LETTERS[lat_band % 24] as char
    );
    if resolution < 2 {
        return code;
    }

    let (dx, dy) = (x % 30, y % 30);
    let east = dx / 15;
    let north = dy / 15;
    let quadrant = if north == 1 { 1 + east } else { 3 + east };
    code.push_str(&quadrant.to_string());
    if resolution < 3 {
        return code;
    }

    let (dx, dy) = (dx % 15, dy % 15);
    let key_col = dx / 5;
    let key_row = 2 - dy / 5;
    code.push_str(&(key_row * 3 + key_col + 1).to_string());
    if resolution < 4 {
        return code;
    }

    let (dx, dy) = (dx % 5, dy % 5);
    let index = (4 - dy) * 5 + dx + 1;
    code.push_str(&format!("{:02}", index));
    code
}

/// Decode a code to `(resolution, west_minutes, south_minutes)`.
fn decode(code: &str) -> Result<(u8, i64, i64), DggsError> {
    let invalid = || DggsError::InvalidCell(code.to_string());
    let bytes = code.as_bytes();
    if !matches!(bytes.len(), 5 | 6 | 7 | 9) || !code.is_ascii() {
        return Err(invalid());
    }

    let digits = |range: std::ops::Range<usize>| -> Result<i64, DggsError> {
        if !bytes[range.clone()].iter().all(u8::is_ascii_digit) {
            return Err(invalid());
        }
        code[range].parse().map_err(|_| invalid())
    };

    let lon_band = digits(0..3)?;
    if !(1..=720).contains(&lon_band) {
        return Err(invalid());
    }
    let letter = |b: u8| LETTERS.iter().position(|l| *l == b.to_ascii_uppercase()).ok_or_else(invalid);
    let lat_band = letter(bytes[3])? * 24 + letter(bytes[4])?;
    if lat_band >= 360 {
        return Err(invalid());
    }
    let mut west = (lon_band - 1) * 30;
    let mut south = lat_band as i64 * 30;
    let mut resolution = 1;

    if bytes.len() >= 6 {
        let quadrant = (bytes[5] as char).to_digit(10).ok_or_else(invalid)? as i64;
        if !(1..=4).contains(&quadrant) {
            return Err(invalid());
        }
        west += ((quadrant - 1) % 2) * 15;
        south += if quadrant <= 2 { 15 } else { 0 };
        resolution = 2;
    }
    if bytes.len() >= 7 {
        let key = (bytes[6] as char).to_digit(10).ok_or_else(invalid)? as i64;
        if !(1..=9).contains(&key) {
            return Err(invalid());
        }
        west += ((key - 1) % 3) * 5;
        south += (2 - (key - 1) / 3) * 5;
        resolution = 3;
    }
    if bytes.len() == 9 {
        let index = digits(7..9)?;
        if !(1..=25).contains(&index) {
            return Err(invalid());
        }
        west += (index - 1) % 5;
        south += 4 - (index - 1) / 5;
        resolution = 4;
    }
    Ok((resolution, west, south))
}

/// GARS cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct GarsAdapter;

impl GarsAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl DggsAdapter for GarsAdapter {
    fn family(&self) -> DggsFamily {
        DggsFamily::Gars
    }

    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError> {
        check_resolution(DggsFamily::Gars, resolution)?;
        let point = checked_point(point)?;
        Ok(CellId::new(encode(point.x, point.y, resolution)))
    }

    fn cell_polygon(&self, id: &CellId) -> Result<Polygon<f64>, DggsError> {
        let (resolution, west, south) = decode(id.as_str())?;
        let size = cell_minutes(resolution) as f64 / 60.0;
        let west = west as f64 / 60.0 - 180.0;
        let south = south as f64 / 60.0 - 90.0;
        Ok(bbox_polygon(west, south, west + size, south + size))
    }

    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError> {
        Ok(decode(id.as_str())?.0)
    }

    fn strategy(&self, resolution: u8) -> Strategy<'_> {
        let step = cell_minutes(resolution) as f64 / 60.0;
        Strategy::Sampled(SampleGrid::grid(step, step, Coord { x: -180.0, y: -90.0 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dggs::test_support::assert_centroid_roundtrip;

    #[test]
    fn test_first_and_last_cells() {
        assert_eq!(encode(-180.0, -90.0, 1), "001AA");
        assert_eq!(encode(180.0, 90.0, 1), "720QZ");
    }

    #[test]
    fn test_known_code() {
        // First band east of Greenwich, first band north of the equator.
        assert_eq!(encode(0.25, 0.25, 1), "361HN");
        assert_eq!(encode(0.1, 0.4, 2), "361HN1");
        assert_eq!(encode(0.4, 0.1, 2), "361HN4");
        assert_eq!(encode(0.01, 0.49, 3), "361HN11");
        assert_eq!(encode(0.01, 0.49, 4), "361HN1101");
    }

    #[test]
    fn test_polygon_sizes() {
        let adapter = GarsAdapter::new();
        for (code, minutes) in [("361HN", 30.0), ("361HN2", 15.0), ("361HN27", 5.0), ("361HN2713", 1.0)] {
            let poly = adapter.cell_polygon(&CellId::from(code)).unwrap();
            let rect = crate::geometry::GeoRect::bounding(poly.exterior().coords().copied()).unwrap();
            assert!((rect.width() - minutes / 60.0).abs() < 1e-9, "{}", code);
        }
    }

    #[test]
    fn test_invalid_codes() {
        for bad in ["000AA", "721AA", "001AI", "001RA", "001AA5", "001AA10", "001AA1126", "001AA110", "1AA"] {
            assert!(decode(bad).is_err(), "{} should be rejected", bad);
        }
        assert_eq!(decode("001AA11"), Ok((3, 0, 25)));
    }

    #[test]
    fn test_signed_numbers_are_rejected() {
        for bad in ["+01AA", "-01AA", " 01AA", "001AA11+5", "001AA11-1"] {
            assert!(decode(bad).is_err(), "{} should be rejected", bad);
        }
        assert!(GarsAdapter::new().cell_polygon(&CellId::from("+01AA")).is_err());
    }

    #[test]
    fn test_centroid_roundtrip() {
        let adapter = GarsAdapter::new();
        let ids: Vec<CellId> = ["001AA", "720QZ", "361HN3", "123CD49", "555PQ4417"]
            .iter()
            .map(|s| CellId::from(*s))
            .collect();
        assert_centroid_roundtrip(&adapter, &ids);
    }
}
