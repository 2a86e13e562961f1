//! Open Location Code (plus codes).
//!
//! Codes are base-20 digit pairs (latitude digit, longitude digit) down to
//! 10 digits, followed by up to five grid digits that split a cell into
//! 5 rows × 4 columns. A `+` follows the eighth digit; shorter codes are
//! padded with `0` up to it. The resolution of a code is its digit count,
//! restricted to `{2, 4, 6, 8, 10, 11, …, 15}`.
//!
//! Enumeration rasterizes the extent at the cell step of the target
//! resolution instead of subdividing, because steps are not uniform per
//! level.

use geo::{Coord, Polygon};

use super::{check_resolution, checked_point, CellId, DggsAdapter, DggsError, SampleGrid, Strategy};
use crate::family::DggsFamily;
use crate::geometry::bbox_polygon;

/// Digit alphabet.
pub const ALPHABET: &[u8; 20] = b"23456789CFGHJMPQRVWX";
/// Separator position in a full code.
const SEPARATOR_POSITION: usize = 8;
const PAIR_LENGTH: usize = 10;
const MAX_DIGITS: usize = 15;
const GRID_ROWS: i64 = 5;
const GRID_COLUMNS: i64 = 4;
/// Degrees of the first pair; each further pair divides by 20.
const PAIR_FIRST_PLACE: f64 = 20.0;
/// Integer units per degree after all fifteen digits.
const LAT_INTEGER_SCALE: f64 = 8000.0 * 3125.0;
const LNG_INTEGER_SCALE: f64 = 8000.0 * 1024.0;

/// Resolutions a code can have.
pub const VALID_RESOLUTIONS: [u8; 10] = [2, 4, 6, 8, 10, 11, 12, 13, 14, 15];

/// `(lat_step, lon_step)` of a cell at `resolution`, degrees.
pub fn cell_step(resolution: u8) -> (f64, f64) {
    let digits = resolution as usize;
    if digits <= PAIR_LENGTH {
        let pairs = (digits / 2).max(1) as i32;
        let size = PAIR_FIRST_PLACE / 20f64.powi(pairs - 1);
        (size, size)
    } else {
        let base = PAIR_FIRST_PLACE / 20f64.powi(4);
        let grid = (digits - PAIR_LENGTH) as i32;
        (base / 5f64.powi(grid), base / 4f64.powi(grid))
    }
}

fn digit_value(c: u8) -> Option<i64> {
    ALPHABET.iter().position(|a| *a == c.to_ascii_uppercase()).map(|p| p as i64)
}

/// Encode a point to a code with `digits` significant digits.
pub fn encode(lat: f64, lon: f64, digits: usize) -> String {
    let digits = digits.clamp(2, MAX_DIGITS);
    let lat = lat.clamp(-90.0, 90.0);
    let mut lon = lon;
    while lon < -180.0 {
        lon += 360.0;
    }
    while lon >= 180.0 {
        lon -= 360.0;
    }

    let mut lat_val = ((lat + 90.0) * LAT_INTEGER_SCALE).floor() as i64;
    let mut lng_val = ((lon + 180.0) * LNG_INTEGER_SCALE).floor() as i64;
    // The north pole belongs to the top row of cells.
    let lat_max = (180.0 * LAT_INTEGER_SCALE) as i64;
    if lat_val >= lat_max {
        lat_val = lat_max - 1;
    }

    let mut reversed: Vec<u8> = Vec::with_capacity(MAX_DIGITS);
    for _ in 0..(MAX_DIGITS - PAIR_LENGTH) {
        let row = lat_val % GRID_ROWS;
        let col = lng_val % GRID_COLUMNS;
        reversed.push(ALPHABET[(row * GRID_COLUMNS + col) as usize]);
        lat_val /= GRID_ROWS;
        lng_val /= GRID_COLUMNS;
    }
    for _ in 0..(PAIR_LENGTH / 2) {
        reversed.push(ALPHABET[(lng_val % 20) as usize]);
        reversed.push(ALPHABET[(lat_val % 20) as usize]);
        lat_val /= 20;
        lng_val /= 20;
    }
    reversed.reverse();
    reversed.truncate(digits);
    format_code(&reversed)
}

fn format_code(digits: &[u8]) -> String {
    let mut code = String::with_capacity(MAX_DIGITS + 1);
    for (i, d) in digits.iter().enumerate() {
        if i == SEPARATOR_POSITION {
            code.push('+');
        }
        code.push(*d as char);
    }
    if digits.len() <= SEPARATOR_POSITION {
        for _ in digits.len()..SEPARATOR_POSITION {
            code.push('0');
        }
        code.push('+');
    }
    code
}

/// Significant digits of a code, validated.
fn significant_digits(code: &str) -> Result<Vec<u8>, DggsError> {
    let invalid = || DggsError::InvalidCell(code.to_string());
    let (head, tail) = code.split_once('+').ok_or_else(invalid)?;
    if head.len() != SEPARATOR_POSITION || tail.contains('+') {
        return Err(invalid());
    }
    let trimmed_head = head.trim_end_matches('0');
    if trimmed_head.contains('0') || (trimmed_head.len() < SEPARATOR_POSITION && !tail.is_empty()) {
        return Err(invalid());
    }
    let digits: Vec<u8> = trimmed_head.bytes().chain(tail.bytes()).map(|b| b.to_ascii_uppercase()).collect();
    if !VALID_RESOLUTIONS.contains(&(digits.len() as u8)) {
        return Err(invalid());
    }
    if digits.iter().any(|d| digit_value(*d).is_none()) {
        return Err(invalid());
    }
    // First latitude digit covers 0..180, first longitude digit 0..360.
    if digit_value(digits[0]).is_some_and(|v| v >= 9) || digit_value(digits[1]).is_some_and(|v| v >= 18) {
        return Err(invalid());
    }
    Ok(digits)
}

/// Decode a code to its `(south, west, north, east)` bounds.
pub fn decode(code: &str) -> Result<(f64, f64, f64, f64), DggsError> {
    let digits = significant_digits(code)?;
    let mut south = -90.0;
    let mut west = -180.0;
    let mut place = PAIR_FIRST_PLACE;
    let pair_digits = digits.len().min(PAIR_LENGTH);
    for pair in digits[..pair_digits].chunks(2) {
        south += digit_value(pair[0]).unwrap_or(0) as f64 * place;
        west += digit_value(pair[1]).unwrap_or(0) as f64 * place;
        place /= 20.0;
    }
    let mut lat_size = place * 20.0;
    let mut lon_size = place * 20.0;
    for d in digits.iter().skip(PAIR_LENGTH) {
        let v = digit_value(*d).unwrap_or(0);
        lat_size /= GRID_ROWS as f64;
        lon_size /= GRID_COLUMNS as f64;
        south += (v / GRID_COLUMNS) as f64 * lat_size;
        west += (v % GRID_COLUMNS) as f64 * lon_size;
    }
    Ok((south, west, (south + lat_size).min(90.0), west + lon_size))
}

/// Open Location Code cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct OlcAdapter;

impl OlcAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl DggsAdapter for OlcAdapter {
    fn family(&self) -> DggsFamily {
        DggsFamily::Olc
    }

    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError> {
        check_resolution(DggsFamily::Olc, resolution)?;
        if !VALID_RESOLUTIONS.contains(&resolution) {
            return Err(DggsError::InvalidResolution {
                family: DggsFamily::Olc,
                resolution,
            });
        }
        let point = checked_point(point)?;
        Ok(CellId::new(encode(point.y, point.x, resolution as usize)))
    }

    fn cell_polygon(&self, id: &CellId) -> Result<Polygon<f64>, DggsError> {
        let (south, west, north, east) = decode(id.as_str())?;
        Ok(bbox_polygon(west, south, east, north))
    }

    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError> {
        Ok(significant_digits(id.as_str())?.len() as u8)
    }

    fn strategy(&self, resolution: u8) -> Strategy<'_> {
        let (lat_step, lon_step) = cell_step(resolution);
        Strategy::Sampled(SampleGrid::grid(lon_step, lat_step, Coord { x: -180.0, y: -90.0 }))
    }
}
