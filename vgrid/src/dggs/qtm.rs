//! Quaternary Triangular Mesh.
//!
//! The sphere is split into the eight faces of an octahedron: four northern
//! facets (`1`–`4`, 90° longitude wedges from −180°) pointing up to the
//! north pole and four southern ones (`5`–`8`) pointing down. Each facet is
//! recursively divided into four triangles (digits `0`–`3`), so a code of
//! length `n` is a cell at resolution `n`.
//!
//! Subdivision happens in a per-facet triangle space with apex `A` at
//! `(0.5, ±1)` and base `W = (0, 0)`, `E = (1, 0)`:
//!
//! ```text
//! lat = 90·y
//! lon = lon₀ + 90·(0.5 + (x − 0.5) / (1 − |y|))
//! ```
//!
//! Child `1` keeps the apex, `2` the west corner, `3` the east corner and
//! `0` is the inverted center triangle.

use geo::{Coord, LineString, Polygon};

use super::{check_resolution, checked_point, CellId, DggsAdapter, DggsError, PrefixHierarchy, Strategy};
use crate::family::DggsFamily;

const MAX_RESOLUTION: usize = 24;

/// Triangle as `[A, W, E]` in facet space.
type Triangle = [Coord<f64>; 3];

fn mid(p: Coord<f64>, q: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (p.x + q.x) / 2.0,
        y: (p.y + q.y) / 2.0,
    }
}

/// Base facet of a root digit: western longitude and triangle.
fn facet(root: u8) -> Option<(f64, Triangle)> {
    let index = root.checked_sub(b'1')?;
    if index > 7 {
        return None;
    }
    let north = index < 4;
    let lon0 = -180.0 + 90.0 * (index % 4) as f64;
    let apex = Coord {
        x: 0.5,
        y: if north { 1.0 } else { -1.0 },
    };
    Some((lon0, [apex, Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }]))
}

/// Subdivide `t` and return child `digit`.
pub fn divide_facet(t: &Triangle, digit: u8) -> Triangle {
    let [a, w, e] = *t;
    match digit {
        0 => [mid(w, e), mid(a, e), mid(a, w)],
        1 => [a, mid(a, w), mid(a, e)],
        2 => [mid(a, w), w, mid(w, e)],
        _ => [mid(a, e), mid(w, e), e],
    }
}

fn barycentric(p: Coord<f64>, t: &Triangle) -> (f64, f64, f64) {
    let [a, w, e] = *t;
    let det = (w.y - e.y) * (a.x - e.x) + (e.x - w.x) * (a.y - e.y);
    let ba = ((w.y - e.y) * (p.x - e.x) + (e.x - w.x) * (p.y - e.y)) / det;
    let bw = ((e.y - a.y) * (p.x - e.x) + (a.x - e.x) * (p.y - e.y)) / det;
    (ba, bw, 1.0 - ba - bw)
}

fn to_facet_space(lon: f64, lat: f64, lon0: f64) -> Coord<f64> {
    let y = lat / 90.0;
    Coord {
        x: 0.5 + ((lon - lon0) / 90.0 - 0.5) * (1.0 - y.abs()),
        y,
    }
}

/// Longitude of a facet-space point, `None` at the apex.
fn facet_lon(p: Coord<f64>, lon0: f64) -> Option<f64> {
    let f = 1.0 - p.y.abs();
    (f > 1e-12).then(|| lon0 + 90.0 * (0.5 + (p.x - 0.5) / f))
}

fn decode(id: &CellId) -> Result<(f64, Triangle), DggsError> {
    let invalid = || DggsError::InvalidCell(id.to_string());
    let bytes = id.as_str().as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_RESOLUTION {
        return Err(invalid());
    }
    let (lon0, mut t) = facet(bytes[0]).ok_or_else(invalid)?;
    for b in &bytes[1..] {
        if !(b'0'..=b'3').contains(b) {
            return Err(invalid());
        }
        t = divide_facet(&t, b - b'0');
    }
    Ok((lon0, t))
}

/// Quaternary Triangular Mesh cells.
#[derive(Debug, Default, Clone, Copy)]
pub struct QtmAdapter;

impl QtmAdapter {
    pub fn new() -> Self {
        Self
    }

    fn edge_segments(resolution: usize) -> usize {
        if resolution <= 6 {
            8
        } else {
            1
        }
    }
}

impl DggsAdapter for QtmAdapter {
    fn family(&self) -> DggsFamily {
        DggsFamily::Qtm
    }

    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError> {
        check_resolution(DggsFamily::Qtm, resolution)?;
        let point = checked_point(point)?;
        let north = point.y >= 0.0;
        let wedge = (((point.x + 180.0) / 90.0).floor() as i64).clamp(0, 3) as u8;
        let root = b'1' + wedge + if north { 0 } else { 4 };
        let (lon0, mut t) = facet(root).ok_or(DggsError::OutOfBounds {
            lon: point.x,
            lat: point.y,
        })?;

        let p = to_facet_space(point.x, point.y, lon0);
        let mut code = String::with_capacity(resolution as usize);
        code.push(root as char);
        for _ in 1..resolution {
            let (a, w, e) = barycentric(p, &t);
            let digit = if a >= 0.5 {
                1
            } else if w >= 0.5 {
                2
            } else if e >= 0.5 {
                3
            } else {
                0
            };
            code.push((b'0' + digit) as char);
            t = divide_facet(&t, digit);
        }
        Ok(CellId::new(code))
    }

    fn cell_polygon(&self, id: &CellId) -> Result<Polygon<f64>, DggsError> {
        let (lon0, t) = decode(id)?;
        let segments = Self::edge_segments(id.len());

        let mut ring: Vec<Coord<f64>> = Vec::with_capacity(3 * segments);
        for k in 0..3 {
            ring.extend(crate::geometry::densify(t[k], t[(k + 1) % 3], segments));
        }

        let n = ring.len();
        let mut coords = Vec::with_capacity(n + 2);
        for (j, p) in ring.iter().enumerate() {
            let lat = 90.0 * p.y;
            match facet_lon(*p, lon0) {
                Some(lon) => coords.push(Coord { x: lon, y: lat }),
                None => {
                    // The apex is a pole; it becomes the stretch of pole line
                    // between its two neighbors.
                    let prev = facet_lon(ring[(j + n - 1) % n], lon0).unwrap_or(lon0);
                    let next = facet_lon(ring[(j + 1) % n], lon0).unwrap_or(lon0);
                    coords.push(Coord { x: prev, y: lat });
                    coords.push(Coord { x: next, y: lat });
                }
            }
        }
        Ok(Polygon::new(LineString::from(coords), vec![]))
    }

    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError> {
        decode(id)?;
        Ok(id.len() as u8)
    }

    fn strategy(&self, _resolution: u8) -> Strategy<'_> {
        Strategy::PrefixRefine(self)
    }
}

impl PrefixHierarchy for QtmAdapter {
    fn roots(&self) -> Vec<CellId> {
        (b'1'..=b'8').map(|b| CellId::new((b as char).to_string())).collect()
    }

    fn children(&self, id: &CellId) -> Result<Vec<CellId>, DggsError> {
        decode(id)?;
        if id.len() >= MAX_RESOLUTION {
            return Ok(Vec::new());
        }
        Ok(('0'..='3').map(|d| CellId::new(format!("{}{}", id, d))).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dggs::test_support::assert_centroid_roundtrip;
    use crate::enumerate::{enumerate, EnumerationContext};
    use crate::geometry::{lon_span, GeoRect};
    use geo::Area;

    #[test]
    fn test_root_facets_tile_the_sphere() {
        let adapter = QtmAdapter::new();
        let roots = adapter.roots();
        assert_eq!(roots.len(), 8);
        let total: f64 = roots
            .iter()
            .map(|id| adapter.cell_polygon(id).unwrap().unsigned_area())
            .sum();
        assert!((total - 360.0 * 180.0).abs() < 1e-6, "area {}", total);
    }

    #[test]
    fn test_root_lookup() {
        let adapter = QtmAdapter::new();
        assert_eq!(adapter.cell_at(Coord { x: -170.0, y: 10.0 }, 1).unwrap().as_str(), "1");
        assert_eq!(adapter.cell_at(Coord { x: 100.0, y: 10.0 }, 1).unwrap().as_str(), "4");
        assert_eq!(adapter.cell_at(Coord { x: 180.0, y: -10.0 }, 1).unwrap().as_str(), "8");
        assert_eq!(adapter.cell_at(Coord { x: 0.0, y: 90.0 }, 3).unwrap().as_str(), "311");
    }

    #[test]
    fn test_children_partition_parent() {
        let adapter = QtmAdapter::new();
        let parent = CellId::from("23");
        let parent_area = adapter.cell_polygon(&parent).unwrap().unsigned_area();
        let child_area: f64 = adapter
            .children(&parent)
            .unwrap()
            .iter()
            .map(|c| adapter.cell_polygon(c).unwrap().unsigned_area())
            .sum();
        assert!((parent_area - child_area).abs() / parent_area < 0.01);
    }

    #[test]
    fn test_invalid_codes() {
        let adapter = QtmAdapter::new();
        for bad in ["", "0", "9", "14", "1a"] {
            assert!(adapter.cell_polygon(&CellId::from(bad)).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_enumerate_codes_have_target_length() {
        let adapter = QtmAdapter::new();
        let extent = GeoRect::new(100.0, 10.0, 110.0, 20.0).unwrap();
        let result = enumerate(&adapter, &EnumerationContext::new(5, extent)).unwrap();
        assert!(!result.cells.is_empty());
        for cell in &result.cells {
            assert_eq!(cell.id.len(), 5);
            assert!(cell.id.as_str().starts_with('4'));
            assert!(lon_span(&cell.polygon) < 180.0);
        }
    }

    #[test]
    fn test_centroid_roundtrip() {
        let adapter = QtmAdapter::new();
        let ids: Vec<CellId> = ["1", "5", "20", "301", "4123", "70321", "8000000", "6313213210"]
            .iter()
            .map(|s| CellId::from(*s))
            .collect();
        assert_centroid_roundtrip(&adapter, &ids);
    }
}
