//! Military Grid Reference System, carved from UTM.
//!
//! | Resolution | Cell              | Example          |
//! |------------|-------------------|------------------|
//! | 0          | grid zone (GZD)   | `31U`            |
//! | 1          | 100 km square     | `31UDQ`          |
//! | 2–5        | 10 km … 10 m      | `31UDQ48251195`  |
//!
//! GZDs are 6° × 8° (band X is 12° tall) with the Norway (`31V`, `32V`)
//! and Svalbard (`31X`–`37X`) exceptions. Squares are laid out on the
//! zone's UTM grid and clipped to their GZD, so squares cut by a zone or
//! band edge come out as partial cells labelled with the GZD they fall in.
//! Coverage is −80° to 84°; the polar UPS areas are out of bounds.

use geo::{BooleanOps, Coord, LineString, Polygon};

use super::{check_resolution, checked_point, CellId, DggsAdapter, DggsError, ExtentLister, Strategy};
use crate::family::DggsFamily;
use crate::geometry::{densify, GeoRect};
use crate::projection::utm;

const BANDS: &[u8; 20] = b"CDEFGHJKLMNPQRSTUVWX";
const COLUMN_SETS: [&[u8; 8]; 3] = [b"ABCDEFGH", b"JKLMNPQR", b"STUVWXYZ"];
const ROW_LETTERS: &[u8; 20] = b"ABCDEFGHJKLMNPQRSTUV";
const SQUARE_M: f64 = 100_000.0;
/// Northing period of the row letters.
const ROW_CYCLE_M: f64 = 2_000_000.0;

pub const MIN_LAT: f64 = -80.0;
pub const MAX_LAT: f64 = 84.0;

/// A grid zone: UTM zone plus latitude band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gzd {
    pub zone: u8,
    pub band: u8,
    pub bounds: GeoRect,
}

impl Gzd {
    /// Zone/band pair, `None` for the three Svalbard gaps or bad input.
    pub fn new(zone: u8, band: u8) -> Option<Self> {
        let band_index = BANDS.iter().position(|b| *b == band)?;
        if !(1..=60).contains(&zone) {
            return None;
        }
        let south = MIN_LAT + 8.0 * band_index as f64;
        let north = if band == b'X' { MAX_LAT } else { south + 8.0 };
        let mut west = -180.0 + 6.0 * (zone - 1) as f64;
        let mut east = west + 6.0;
        match (zone, band) {
            (31, b'V') => east = 3.0,
            (32, b'V') => west = 3.0,
            (32 | 34 | 36, b'X') => return None,
            (31, b'X') => east = 9.0,
            (33, b'X') => (west, east) = (9.0, 21.0),
            (35, b'X') => (west, east) = (21.0, 33.0),
            (37, b'X') => west = 33.0,
            _ => {}
        }
        Some(Self {
            zone,
            band,
            bounds: GeoRect {
                min_lon: west,
                min_lat: south,
                max_lon: east,
                max_lat: north,
            },
        })
    }

    /// GZD containing a point, `None` outside −80°…84°.
    pub fn containing(lon: f64, lat: f64) -> Option<Self> {
        if !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return None;
        }
        let band_index = (((lat - MIN_LAT) / 8.0).floor() as usize).min(BANDS.len() - 1);
        let band = BANDS[band_index];
        let mut zone = utm::zone_for_lon(lon);
        if band == b'V' && (3.0..12.0).contains(&lon) {
            zone = 32;
        }
        if band == b'X' && (0.0..42.0).contains(&lon) {
            zone = match lon {
                l if l < 9.0 => 31,
                l if l < 21.0 => 33,
                l if l < 33.0 => 35,
                _ => 37,
            };
        }
        Self::new(zone, band)
    }

    /// Every GZD, band by band from the south.
    pub fn all() -> Vec<Self> {
        BANDS
            .iter()
            .flat_map(|band| (1..=60).filter_map(move |zone| Self::new(zone, *band)))
            .collect()
    }

    pub fn north(&self) -> bool {
        self.band >= b'N'
    }

    pub fn label(&self) -> String {
        format!("{}{}", self.zone, self.band as char)
    }

    fn to_utm(&self, lon: f64, lat: f64) -> Result<(f64, f64), DggsError> {
        utm::forward(self.zone, self.north(), lon, lat).map_err(|e| DggsError::Backend(e.to_string()))
    }

    fn from_utm(&self, easting: f64, northing: f64) -> Result<Coord<f64>, DggsError> {
        let (lon, lat) =
            utm::inverse(self.zone, self.north(), easting, northing).map_err(|e| DggsError::Backend(e.to_string()))?;
        Ok(Coord { x: lon, y: lat })
    }

    /// Easting/northing bounds of a lon/lat rectangle inside this GZD.
    fn utm_bounds(&self, rect: &GeoRect) -> Result<(f64, f64, f64, f64), DggsError> {
        let corners = [
            Coord { x: rect.min_lon, y: rect.min_lat },
            Coord { x: rect.max_lon, y: rect.min_lat },
            Coord { x: rect.max_lon, y: rect.max_lat },
            Coord { x: rect.min_lon, y: rect.max_lat },
        ];
        let (mut e0, mut n0, mut e1, mut n1) = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for k in 0..4 {
            for c in densify(corners[k], corners[(k + 1) % 4], 8) {
                let (e, n) = self.to_utm(c.x, c.y)?;
                e0 = e0.min(e);
                e1 = e1.max(e);
                n0 = n0.min(n);
                n1 = n1.max(n);
            }
        }
        Ok((e0, n0, e1, n1))
    }
}

/// Square size in meters at a resolution ≥ 1.
pub fn square_size(resolution: u8) -> f64 {
    SQUARE_M / 10f64.powi(resolution.max(1) as i32 - 1)
}

fn row_offset(zone: u8) -> usize {
    if zone % 2 == 0 {
        5
    } else {
        0
    }
}

/// Code of the square at `(easting, northing)` in `gzd`.
fn square_code(gzd: &Gzd, easting: f64, northing: f64, resolution: u8) -> Option<String> {
    let column = (easting / SQUARE_M).floor() as i64;
    if !(1..=8).contains(&column) || northing < 0.0 {
        return None;
    }
    let set = COLUMN_SETS[(gzd.zone as usize - 1) % 3];
    let row = (northing / SQUARE_M).floor() as usize;
    let mut code = gzd.label();
    code.push(set[column as usize - 1] as char);
    code.push(ROW_LETTERS[(row + row_offset(gzd.zone)) % 20] as char);

    let digits = resolution as usize - 1;
    if digits > 0 {
        let size = square_size(resolution);
        let e = ((easting % SQUARE_M) / size).floor() as u64;
        let n = ((northing % SQUARE_M) / size).floor() as u64;
        code.push_str(&format!("{:0width$}{:0width$}", e, n, width = digits));
    }
    Some(code)
}

/// Parsed id: GZD plus square origin and size (meters) for resolution ≥ 1.
struct Parsed {
    gzd: Gzd,
    resolution: u8,
    square: Option<(f64, f64, f64)>,
}

fn parse(id: &str) -> Option<Parsed> {
    let zone_len = id.bytes().take_while(|b| b.is_ascii_digit()).count();
    if !(1..=2).contains(&zone_len) || id.len() <= zone_len {
        return None;
    }
    let zone: u8 = id[..zone_len].parse().ok()?;
    let rest = id[zone_len..].as_bytes();
    let gzd = Gzd::new(zone, rest[0].to_ascii_uppercase())?;
    if rest.len() == 1 {
        return Some(Parsed {
            gzd,
            resolution: 0,
            square: None,
        });
    }
    if rest.len() < 3 {
        return None;
    }
    let set = COLUMN_SETS[(zone as usize - 1) % 3];
    let column = set.iter().position(|c| *c == rest[1].to_ascii_uppercase())? + 1;
    let row_letter = ROW_LETTERS.iter().position(|c| *c == rest[2].to_ascii_uppercase())?;
    let row = (row_letter + 20 - row_offset(zone)) % 20;

    let digits = &rest[3..];
    if digits.len() % 2 != 0 || digits.len() > 8 || !digits.iter().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let precision = digits.len() / 2;
    let resolution = precision as u8 + 1;
    let size = square_size(resolution);
    let text = std::str::from_utf8(digits).ok()?;
    let (e_digits, n_digits) = text.split_at(precision);
    let e_offset: f64 = if precision > 0 { e_digits.parse::<u64>().ok()? as f64 * size } else { 0.0 };
    let n_offset: f64 = if precision > 0 { n_digits.parse::<u64>().ok()? as f64 * size } else { 0.0 };

    // Lift the row into the 2000 km cycle that overlaps the band.
    let band_floor = gzd
        .to_utm(utm::central_meridian(zone).clamp(gzd.bounds.min_lon, gzd.bounds.max_lon), gzd.bounds.min_lat)
        .ok()?
        .1;
    let mut northing = row as f64 * SQUARE_M;
    while northing + SQUARE_M <= band_floor {
        northing += ROW_CYCLE_M;
    }

    Some(Parsed {
        gzd,
        resolution,
        square: Some((column as f64 * SQUARE_M + e_offset, northing + n_offset, size)),
    })
}

/// MGRS cells (batch generation only).
#[derive(Debug, Default, Clone, Copy)]
pub struct MgrsAdapter;

impl MgrsAdapter {
    pub fn new() -> Self {
        Self
    }

    /// WGS84 outline of a UTM square clipped to its GZD.
    fn carve(gzd: &Gzd, easting: f64, northing: f64, size: f64) -> Result<Option<Polygon<f64>>, DggsError> {
        let corners = [
            Coord { x: easting, y: northing },
            Coord { x: easting + size, y: northing },
            Coord { x: easting + size, y: northing + size },
            Coord { x: easting, y: northing + size },
        ];
        let segments = if size >= SQUARE_M { 4 } else { 1 };
        let mut ring = Vec::with_capacity(4 * segments + 1);
        for k in 0..4 {
            for c in densify(corners[k], corners[(k + 1) % 4], segments) {
                ring.push(gzd.from_utm(c.x, c.y)?);
            }
        }
        let square = Polygon::new(LineString::from(ring), vec![]);
        let clipped = square.intersection(&gzd.bounds.to_polygon());
        Ok(clipped
            .0
            .into_iter()
            .filter(|p| p.exterior().0.len() >= 4)
            .max_by_key(|p| p.exterior().0.len()))
    }
}

impl DggsAdapter for MgrsAdapter {
    fn family(&self) -> DggsFamily {
        DggsFamily::Mgrs
    }

    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError> {
        check_resolution(DggsFamily::Mgrs, resolution)?;
        let point = checked_point(point)?;
        let out_of_bounds = || DggsError::OutOfBounds {
            lon: point.x,
            lat: point.y,
        };
        let gzd = Gzd::containing(point.x, point.y).ok_or_else(out_of_bounds)?;
        if resolution == 0 {
            return Ok(CellId::new(gzd.label()));
        }
        let (easting, northing) = gzd.to_utm(point.x, point.y)?;
        square_code(&gzd, easting, northing, resolution)
            .map(CellId::new)
            .ok_or_else(out_of_bounds)
    }

    fn cell_polygon(&self, id: &CellId) -> Result<Polygon<f64>, DggsError> {
        let parsed = parse(id.as_str()).ok_or_else(|| DggsError::InvalidCell(id.to_string()))?;
        match parsed.square {
            None => Ok(parsed.gzd.bounds.to_polygon()),
            Some((easting, northing, size)) => Self::carve(&parsed.gzd, easting, northing, size)?
                .ok_or_else(|| DggsError::InvalidCell(id.to_string())),
        }
    }

    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError> {
        parse(id.as_str())
            .map(|p| p.resolution)
            .ok_or_else(|| DggsError::InvalidCell(id.to_string()))
    }

    fn strategy(&self, _resolution: u8) -> Strategy<'_> {
        Strategy::GeoExtentList(self)
    }
}

impl ExtentLister for MgrsAdapter {
    /// GZDs touching the extent, then, per GZD, the UTM squares covering
    /// the part of the extent inside it.
    fn list_cells(&self, resolution: u8, extent: &GeoRect, limit: usize) -> Result<Vec<CellId>, DggsError> {
        check_resolution(DggsFamily::Mgrs, resolution)?;
        let extent_polygon = extent.to_polygon();
        let mut ids = Vec::new();

        for gzd in Gzd::all() {
            let Some(clip) = overlap(&gzd.bounds, extent) else {
                continue;
            };
            if resolution == 0 {
                ids.push(CellId::new(gzd.label()));
                if ids.len() >= limit {
                    return Ok(ids);
                }
                continue;
            }

            let size = square_size(resolution);
            let (e0, n0, e1, n1) = gzd.utm_bounds(&clip)?;
            let mut northing = (n0 / size).floor() * size;
            while northing < n1 {
                let mut easting = (e0 / size).floor() * size;
                while easting < e1 {
                    if let Some(code) = square_code(&gzd, easting, northing, resolution) {
                        if let Some(piece) = Self::carve(&gzd, easting, northing, size)? {
                            if geo::Intersects::intersects(&piece, &extent_polygon) {
                                ids.push(CellId::new(code));
                                if ids.len() >= limit {
                                    return Ok(ids);
                                }
                            }
                        }
                    }
                    easting += size;
                }
                northing += size;
            }
        }
        Ok(ids)
    }
}

/// Intersection of two rectangles, `None` when they do not overlap.
fn overlap(a: &GeoRect, b: &GeoRect) -> Option<GeoRect> {
    let rect = GeoRect {
        min_lon: a.min_lon.max(b.min_lon),
        min_lat: a.min_lat.max(b.min_lat),
        max_lon: a.max_lon.min(b.max_lon),
        max_lat: a.max_lat.min(b.max_lat),
    };
    (rect.min_lon < rect.max_lon && rect.min_lat < rect.max_lat).then_some(rect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dggs::test_support::assert_centroid_roundtrip;
    use crate::enumerate::{enumerate, EnumerationContext};
    use std::collections::HashSet;

    fn code(lon: f64, lat: f64, resolution: u8) -> String {
        MgrsAdapter::new()
            .cell_at(Coord { x: lon, y: lat }, resolution)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_eiffel_tower() {
        assert_eq!(code(2.2945, 48.8584, 0), "31U");
        assert_eq!(code(2.2945, 48.8584, 1), "31UDQ");
        assert_eq!(code(2.2945, 48.8584, 5), "31UDQ48251195");
    }

    #[test]
    fn test_zone_exceptions() {
        assert_eq!(code(5.0, 60.0, 0), "32V");
        assert_eq!(code(2.0, 60.0, 0), "31V");
        assert_eq!(code(15.0, 78.0, 0), "33X");
        assert_eq!(code(40.0, 78.0, 0), "37X");
        assert!(Gzd::new(32, b'X').is_none());
        assert_eq!(Gzd::all().len(), 20 * 60 - 3);
    }

    #[test]
    fn test_polar_caps_are_out_of_bounds() {
        let adapter = MgrsAdapter::new();
        for lat in [-85.0, 85.0] {
            assert!(matches!(
                adapter.cell_at(Coord { x: 0.0, y: lat }, 1),
                Err(DggsError::OutOfBounds { .. })
            ));
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "U", "61U", "32X", "31UI", "31UDQ1", "31UDQ12a4", "31UDQ123456789"] {
            assert!(parse(bad).is_none(), "{}", bad);
        }
        assert_eq!(parse("31UDQ48251195").map(|p| p.resolution), Some(5));
    }

    #[test]
    fn test_square_contains_its_point() {
        use geo::Contains;
        let adapter = MgrsAdapter::new();
        for (lon, lat, r) in [(2.2945, 48.8584, 3), (-74.0445, 40.6892, 2), (151.2153, -33.8568, 4)] {
            let id = adapter.cell_at(Coord { x: lon, y: lat }, r).unwrap();
            let polygon = adapter.cell_polygon(&id).unwrap();
            assert!(polygon.contains(&geo::Point::new(lon, lat)), "{}", id);
        }
    }

    #[test]
    fn test_carving_clips_to_gzd() {
        // A square straddling the 31U/32U boundary exists in both zones as
        // two partial cells.
        let adapter = MgrsAdapter::new();
        let extent = GeoRect::new(5.8, 50.0, 6.2, 50.5).unwrap();
        let result = enumerate(&adapter, &EnumerationContext::new(1, extent)).unwrap();
        let zones: HashSet<&str> = result.ids().map(|id| &id.as_str()[..3]).collect();
        assert!(zones.contains("31U") && zones.contains("32U"));
        for cell in &result.cells {
            let rect = GeoRect::bounding(cell.polygon.exterior().coords().copied()).unwrap();
            let gzd = parse(cell.id.as_str()).unwrap().gzd.bounds;
            assert!(rect.min_lon >= gzd.min_lon - 1e-9 && rect.max_lon <= gzd.max_lon + 1e-9, "{}", cell.id);
        }
    }

    #[test]
    fn test_gzd_listing() {
        let adapter = MgrsAdapter::new();
        let extent = GeoRect::new(0.5, 45.0, 7.5, 52.0).unwrap();
        let ids = adapter.list_cells(0, &extent, 100).unwrap();
        let labels: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(labels, vec!["31T", "32T", "31U", "32U"]);
    }

    #[test]
    fn test_centroid_roundtrip() {
        let adapter = MgrsAdapter::new();
        let ids: Vec<CellId> = ["31U", "31UDQ", "31UDQ48", "31UDQ4811", "33HYD", "18TWL8060"]
            .iter()
            .map(|s| CellId::from(*s))
            .collect();
        assert_centroid_roundtrip(&adapter, &ids);
    }
}
