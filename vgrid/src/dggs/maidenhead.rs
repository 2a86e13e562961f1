//! Maidenhead locator grid.
//!
//! Pairs alternate letters and digits: a 20°×10° field (`A`–`R`), a 2°×1°
//! square (`0`–`9`), a 5′×2.5′ subsquare (`a`–`x`) and a 30″×15″ extended
//! square (`0`–`9`). Resolution counts the pairs.

use geo::{Coord, Polygon};

use super::{check_resolution, checked_point, CellId, DggsAdapter, DggsError, SampleGrid, Strategy};
use crate::family::DggsFamily;
use crate::geometry::bbox_polygon;

/// Finest longitude unit: 1/120°.
const LON_UNITS_PER_DEG: f64 = 120.0;
/// Finest latitude unit: 1/240°.
const LAT_UNITS_PER_DEG: f64 = 240.0;
const LON_UNITS: i64 = 360 * 120;
const LAT_UNITS: i64 = 180 * 240;

/// Per pair: (radix, finest units spanned by one step).
const LEVELS: [(i64, i64); 4] = [(18, 2400), (10, 240), (24, 10), (10, 1)];

/// Cell size in degrees (lon, lat) at a resolution.
pub fn cell_size(resolution: u8) -> (f64, f64) {
    let units = LEVELS[(resolution.clamp(1, 4) - 1) as usize].1 as f64;
    (units / LON_UNITS_PER_DEG, units / LAT_UNITS_PER_DEG)
}

fn symbol(level: usize, value: i64) -> char {
    match level {
        0 => (b'A' + value as u8) as char,
        2 => (b'a' + value as u8) as char,
        _ => (b'0' + value as u8) as char,
    }
}

fn value(level: usize, c: u8) -> Option<i64> {
    let (base, radix) = match level {
        0 => (b'A', 18),
        2 => (b'a', 24),
        _ => (b'0', 10),
    };
    let c = match level {
        0 => c.to_ascii_uppercase(),
        2 => c.to_ascii_lowercase(),
        _ => c,
    };
    let v = c.checked_sub(base)? as i64;
    (v < radix).then_some(v)
}

/// Encode a point at `resolution` pairs.
pub fn encode(lon: f64, lat: f64, resolution: u8) -> String {
    let x = (((lon + 180.0) * LON_UNITS_PER_DEG).floor() as i64).clamp(0, LON_UNITS - 1);
    let y = (((lat + 90.0) * LAT_UNITS_PER_DEG).floor() as i64).clamp(0, LAT_UNITS - 1);

    let mut code = String::with_capacity(resolution as usize * 2);
    for (level, (radix, units)) in LEVELS.iter().enumerate().take(resolution as usize) {
        code.push(symbol(level, (x / units) % radix));
        code.push(symbol(level, (y / units) % radix));
    }
    code
}

/// Decode to `(resolution, west_units, south_units)`.
fn decode(code: &str) -> Result<(u8, i64, i64), DggsError> {
    let bytes = code.as_bytes();
    if bytes.is_empty() || bytes.len() % 2 != 0 || bytes.len() > 8 {
        return Err(DggsError::InvalidCell(code.to_string()));
    }
    let (mut x, mut y) = (0, 0);
    for (level, pair) in bytes.chunks(2).enumerate() {
        let units = LEVELS[level].1;
        let vx = value(level, pair[0]).ok_or_else(|| DggsError::InvalidCell(code.to_string()))?;
        let vy = value(level, pair[1]).ok_or_else(|| DggsError::InvalidCell(code.to_string()))?;
        x += vx * units;
        y += vy * units;
    }
    Ok(((bytes.len() / 2) as u8, x, y))
}

/// Maidenhead locators.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaidenheadAdapter;

impl MaidenheadAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl DggsAdapter for MaidenheadAdapter {
    fn family(&self) -> DggsFamily {
        DggsFamily::Maidenhead
    }

    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError> {
        check_resolution(DggsFamily::Maidenhead, resolution)?;
        let point = checked_point(point)?;
        Ok(CellId::new(encode(point.x, point.y, resolution)))
    }

    fn cell_polygon(&self, id: &CellId) -> Result<Polygon<f64>, DggsError> {
        let (resolution, x, y) = decode(id.as_str())?;
        let (w, h) = cell_size(resolution);
        let west = x as f64 / LON_UNITS_PER_DEG - 180.0;
        let south = y as f64 / LAT_UNITS_PER_DEG - 90.0;
        Ok(bbox_polygon(west, south, west + w, south + h))
    }

    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError> {
        Ok(decode(id.as_str())?.0)
    }

    fn strategy(&self, resolution: u8) -> Strategy<'_> {
        let (w, h) = cell_size(resolution);
        Strategy::Sampled(SampleGrid::grid(w, h, Coord { x: -180.0, y: -90.0 }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dggs::test_support::assert_centroid_roundtrip;
    use crate::enumerate::{enumerate, EnumerationContext};
    use crate::geometry::GeoRect;

    #[test]
    fn test_known_locators() {
        // Munich
        assert_eq!(encode(11.5755, 48.1374, 3), "JN58sd");
        // Cape Town
        assert_eq!(encode(18.4241, -33.9249, 2), "JF96");
        assert_eq!(encode(-180.0, -90.0, 4), "AA00aa00");
        assert_eq!(encode(180.0, 90.0, 1), "RR");
    }

    #[test]
    fn test_decode_is_case_insensitive() {
        assert_eq!(decode("jn58TD"), decode("JN58td"));
    }

    #[test]
    fn test_invalid_locators() {
        for bad in ["", "J", "SA", "JNA8", "JN58ty", "JN58td0", "JN58td00aa"] {
            assert!(decode(bad).is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_world_fields() {
        let ctx = EnumerationContext::new(1, GeoRect::world());
        let result = enumerate(&MaidenheadAdapter::new(), &ctx).unwrap();
        assert_eq!(result.cells.len(), 18 * 18);
        assert!(result.is_complete());
    }

    #[test]
    fn test_centroid_roundtrip() {
        let adapter = MaidenheadAdapter::new();
        let ids: Vec<CellId> = ["AA", "RR", "JN58", "JN58td", "FN31pr42", "RR99xx99"]
            .iter()
            .map(|s| CellId::from(*s))
            .collect();
        assert_centroid_roundtrip(&adapter, &ids);
    }
}
