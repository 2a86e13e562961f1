//! Geohash adapter (prefix refinement over the base-32 alphabet).

use geo::{Coord, Polygon};

use super::{check_resolution, checked_point, CellId, DggsAdapter, DggsError, PrefixHierarchy, Strategy};
use crate::family::DggsFamily;
use crate::geometry::bbox_polygon;

/// Geohash base-32 alphabet, in code order.
pub const ALPHABET: &str = "0123456789bcdefghjkmnpqrstuvwxyz";

/// The 32 single-character roots.
pub const INITIAL_GEOHASHES: [&str; 32] = [
    "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "b", "c", "d", "e", "f", "g", "h", "j", "k",
    "m", "n", "p", "q", "r", "s", "t", "u", "v", "w", "x", "y", "z",
];

/// Geohash cells; the code length is the resolution.
#[derive(Debug, Default, Clone, Copy)]
pub struct GeohashAdapter;

impl GeohashAdapter {
    pub fn new() -> Self {
        Self
    }

    fn validate(id: &CellId) -> Result<(), DggsError> {
        let valid = !id.is_empty()
            && id.len() <= 12
            && id.as_str().chars().all(|c| ALPHABET.contains(c));
        if valid {
            Ok(())
        } else {
            Err(DggsError::InvalidCell(id.to_string()))
        }
    }
}

impl DggsAdapter for GeohashAdapter {
    fn family(&self) -> DggsFamily {
        DggsFamily::Geohash
    }

    fn cell_at(&self, point: Coord<f64>, resolution: u8) -> Result<CellId, DggsError> {
        check_resolution(DggsFamily::Geohash, resolution)?;
        let point = checked_point(point)?;
        geohash::encode(point, resolution as usize)
            .map(CellId::from)
            .map_err(|e| DggsError::Backend(e.to_string()))
    }

    fn cell_polygon(&self, id: &CellId) -> Result<Polygon<f64>, DggsError> {
        Self::validate(id)?;
        let rect = geohash::decode_bbox(id.as_str()).map_err(|_| DggsError::InvalidCell(id.to_string()))?;
        let (min, max) = (rect.min(), rect.max());
        Ok(bbox_polygon(min.x, min.y, max.x, max.y))
    }

    fn resolution_of(&self, id: &CellId) -> Result<u8, DggsError> {
        Self::validate(id)?;
        Ok(id.len() as u8)
    }

    fn strategy(&self, _resolution: u8) -> Strategy<'_> {
        Strategy::PrefixRefine(self)
    }
}

impl PrefixHierarchy for GeohashAdapter {
    fn roots(&self) -> Vec<CellId> {
        INITIAL_GEOHASHES.iter().map(|c| CellId::from(*c)).collect()
    }

    fn children(&self, id: &CellId) -> Result<Vec<CellId>, DggsError> {
        Self::validate(id)?;
        Ok(ALPHABET
            .chars()
            .map(|c| CellId::new(format!("{}{}", id, c)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dggs::test_support::assert_centroid_roundtrip;
    use crate::enumerate::{enumerate, EnumerationContext};
    use crate::geometry::GeoRect;
    use std::collections::HashSet;

    #[test]
    fn test_roots_are_sorted_alphabet() {
        let roots = GeohashAdapter::new().roots();
        assert_eq!(roots.len(), 32);
        let mut sorted = roots.clone();
        sorted.sort();
        assert_eq!(roots, sorted);
    }

    #[test]
    fn test_known_cell() {
        let adapter = GeohashAdapter::new();
        // Jakarta falls in "qqg".
        let id = adapter.cell_at(Coord { x: 106.8, y: -6.2 }, 3).unwrap();
        assert_eq!(id.as_str(), "qqg");
        let poly = adapter.cell_polygon(&id).unwrap();
        assert!(GeoRect::new(106.8, -6.2, 106.8, -6.2).unwrap().intersects_polygon(&poly));
    }

    #[test]
    fn test_rejects_bad_codes() {
        let adapter = GeohashAdapter::new();
        assert!(adapter.cell_polygon(&CellId::from("wa")).is_err());
        assert!(adapter.cell_polygon(&CellId::from("")).is_err());
        assert!(adapter.cell_at(Coord { x: 0.0, y: 0.0 }, 11).is_err());
    }

    #[test]
    fn test_prefix_refine_only_w_survives() {
        let adapter = GeohashAdapter::new();
        let extent = GeoRect::new(100.0, 10.0, 110.0, 20.0).unwrap();
        let result = enumerate(&adapter, &EnumerationContext::new(3, extent)).unwrap();
        assert!(!result.cells.is_empty());
        let mut unique = HashSet::new();
        for cell in &result.cells {
            assert_eq!(cell.id.len(), 3);
            assert!(cell.id.as_str().starts_with('w'));
            assert!(unique.insert(cell.id.clone()));
        }
        let ids: Vec<_> = result.ids().cloned().collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted, "prefix refinement emits in lexicographic order");
    }

    #[test]
    fn test_centroid_roundtrip() {
        let adapter = GeohashAdapter::new();
        let ids: Vec<CellId> = ["w", "wx", "u4pru", "9q8yyk"].iter().map(|s| CellId::from(*s)).collect();
        assert_centroid_roundtrip(&adapter, &ids);
    }
}
