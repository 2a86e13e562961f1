//! Antimeridian repair.
//!
//! A cell straddling ±180° comes out of a DGGS library as a ring whose
//! consecutive vertices jump by almost 360° of longitude. Drawn as planar
//! geometry that ring self-intersects and smears across the whole map.
//! [`AntimeridianPolicy`] decides how such rings are exported:
//!
//! | Policy      | Output                                                    |
//! |-------------|-----------------------------------------------------------|
//! | `Ignore`    | ring unchanged (adapter already emits seam-clean rings)   |
//! | `Split`     | two polygons, one at lon ≥ 0 and one at lon ≤ 0           |
//! | `ShiftEast` | one ring, negative longitudes rewritten as `lon + 360`    |
//!
//! Polygons that do not cross the seam pass through every policy untouched.
//! Polar caps count as non-crossing even though they span all longitudes.

use std::fmt;
use std::str::FromStr;

use geo::{BooleanOps, Coord, MapCoords, Polygon};

use super::bbox_polygon;

/// How seam-crossing cell polygons are exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AntimeridianPolicy {
    /// Leave rings as produced by the adapter.
    #[default]
    Ignore,
    /// Replace a crossing ring by its western and eastern pieces.
    Split,
    /// Rewrite negative longitudes as `lon + 360`.
    ShiftEast,
}

impl AntimeridianPolicy {
    /// All policies, in display order.
    pub const ALL: [AntimeridianPolicy; 3] = [
        AntimeridianPolicy::Ignore,
        AntimeridianPolicy::Split,
        AntimeridianPolicy::ShiftEast,
    ];

    /// Configuration name of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            AntimeridianPolicy::Ignore => "ignore",
            AntimeridianPolicy::Split => "split",
            AntimeridianPolicy::ShiftEast => "shift_east",
        }
    }

    /// Apply the policy to one cell polygon.
    pub fn apply(self, polygon: Polygon<f64>) -> Vec<Polygon<f64>> {
        if !crosses_antimeridian(&polygon) {
            return vec![polygon];
        }
        match self {
            AntimeridianPolicy::Ignore => vec![polygon],
            AntimeridianPolicy::Split => split(&polygon),
            AntimeridianPolicy::ShiftEast => vec![shift_east(&polygon)],
        }
    }
}

impl fmt::Display for AntimeridianPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AntimeridianPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "ignore" | "none" => Ok(AntimeridianPolicy::Ignore),
            "split" => Ok(AntimeridianPolicy::Split),
            "shift_east" | "shift" => Ok(AntimeridianPolicy::ShiftEast),
            other => Err(format!("unknown antimeridian policy '{}'", other)),
        }
    }
}

/// Whether any edge of the exterior ring jumps across the seam.
///
/// Edges running along a pole line (as closed by
/// [`super::ring_to_polygon`]) are not seam jumps.
pub fn crosses_antimeridian(polygon: &Polygon<f64>) -> bool {
    polygon.exterior().lines().any(|line| {
        let along_pole = (line.start.y.abs() - 90.0).abs() < 1e-9
            && (line.end.y.abs() - 90.0).abs() < 1e-9;
        !along_pole && (line.end.x - line.start.x).abs() > 180.0
    })
}

/// Rewrite negative longitudes of a crossing ring as `lon + 360`.
///
/// The result is one contiguous ring in `[0, 540)`. Rings that do not cross
/// are returned unchanged.
pub fn shift_east(polygon: &Polygon<f64>) -> Polygon<f64> {
    if !crosses_antimeridian(polygon) {
        return polygon.clone();
    }
    polygon.map_coords(|c| Coord {
        x: if c.x < 0.0 { c.x + 360.0 } else { c.x },
        y: c.y,
    })
}

/// H3 seam fixer.
///
/// Only cells whose vertices sit near both +180 and -180 are rewritten, the
/// negative ones gaining 360. A specialization of [`shift_east`].
pub fn fix_h3(polygon: Polygon<f64>) -> Polygon<f64> {
    let coords = polygon.exterior().coords();
    let (mut near_east, mut near_west) = (false, false);
    for c in coords {
        near_east |= c.x > 90.0;
        near_west |= c.x < -90.0;
    }
    if near_east && near_west && crosses_antimeridian(&polygon) {
        shift_east(&polygon)
    } else {
        polygon
    }
}

/// Split a crossing ring at the seam.
///
/// Returns the western piece (all longitudes ≥ 0) and the eastern piece
/// shifted back into [-180, 0]. Non-crossing rings come back as a single
/// element.
///
/// Every piece spans less than 180° of longitude, with one exception:
/// polar caps closed by [`super::ring_to_polygon`] run from -180 to 180
/// along the pole line. Their pole edge is not a seam jump, so they pass
/// through unsplit and keep a 360° span. Use [`super::is_polar_cap`] to
/// tell them apart.
pub fn split(polygon: &Polygon<f64>) -> Vec<Polygon<f64>> {
    if !crosses_antimeridian(polygon) {
        return vec![polygon.clone()];
    }
    let shifted = shift_east(polygon);
    let west_half = bbox_polygon(0.0, -90.0, 180.0, 90.0);
    let east_half = bbox_polygon(180.0, -90.0, 540.0, 90.0);

    let mut pieces: Vec<Polygon<f64>> = shifted.intersection(&west_half).0;
    pieces.extend(
        shifted
            .intersection(&east_half)
            .0
            .into_iter()
            .map(|p| p.map_coords(|c| Coord { x: c.x - 360.0, y: c.y })),
    );
    pieces.retain(|p| p.exterior().0.len() >= 4);
    if pieces.is_empty() {
        // Degenerate sliver; keep the shifted ring rather than dropping the cell.
        return vec![shifted];
    }
    pieces
}
