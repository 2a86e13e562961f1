//! Point sampling for families with a cheap `point → cell` function.
//!
//! The extent is rasterized on the adapter's [`SampleGrid`]; each sample is
//! located, duplicates are dropped by id, and the polygons of the remaining
//! cells are emitted. Points outside the family's coverage are ignored.

use geo::Coord;

use super::{Emitter, Enumeration, EnumerationContext, Flow};
use crate::dggs::{DggsAdapter, DggsError, SampleAlign, SampleGrid};
use crate::geometry::GeoRect;

/// One axis of a sample lattice, indexed rather than materialized.
#[derive(Debug, Clone, Copy)]
enum Axis {
    /// `min, min + step, …` below `max`, then `max` itself.
    Strided { min: f64, max: f64, step: f64, inner: u64 },
    /// Interval centers `origin + (i + 0.5)·step` for `i` in `first..=last`.
    Centers { origin: f64, step: f64, first: i64, last: i64 },
}

impl Axis {
    fn strided(min: f64, max: f64, step: f64) -> Self {
        let inner = if max > min { ((max - min) / step).ceil() as u64 } else { 0 };
        Axis::Strided { min, max, step, inner }
    }

    fn centers(origin: f64, min: f64, max: f64, step: f64) -> Self {
        let first = ((min - origin) / step).floor() as i64;
        let last = (((max - origin) / step).ceil() as i64 - 1).max(first);
        Axis::Centers { origin, step, first, last }
    }

    fn len(&self) -> u64 {
        match *self {
            Axis::Strided { inner, .. } => inner + 1,
            Axis::Centers { first, last, .. } => (last - first) as u64 + 1,
        }
    }

    fn at(&self, i: u64) -> f64 {
        match *self {
            Axis::Strided { min, max, step, inner } => {
                if i < inner {
                    min + i as f64 * step
                } else {
                    max
                }
            }
            Axis::Centers { origin, step, first, .. } => origin + ((first + i as i64) as f64 + 0.5) * step,
        }
    }

    fn values(self) -> impl Iterator<Item = f64> {
        (0..self.len()).map(move |i| self.at(i))
    }
}

/// Lazily evaluated sample lattice over an extent.
#[derive(Debug, Clone, Copy)]
struct Lattice {
    xs: Axis,
    ys: Axis,
}

impl Lattice {
    fn new(grid: &SampleGrid, extent: &GeoRect) -> Option<Self> {
        let valid = |step: f64| step.is_finite() && step > 0.0;
        if !valid(grid.lon_step) || !valid(grid.lat_step) {
            return None;
        }
        Some(match grid.align {
            SampleAlign::Extent => Lattice {
                xs: Axis::strided(extent.min_lon, extent.max_lon, grid.lon_step),
                ys: Axis::strided(extent.min_lat, extent.max_lat, grid.lat_step),
            },
            SampleAlign::Grid { origin } => Lattice {
                xs: Axis::centers(origin.x, extent.min_lon, extent.max_lon, grid.lon_step),
                ys: Axis::centers(origin.y, extent.min_lat, extent.max_lat, grid.lat_step),
            },
        })
    }
}

/// Sample points of a grid over an extent, row by row from the south-west.
pub fn sample_points(grid: &SampleGrid, extent: &GeoRect) -> impl Iterator<Item = Coord<f64>> {
    Lattice::new(grid, extent).into_iter().flat_map(|lattice| {
        let xs = lattice.xs;
        lattice
            .ys
            .values()
            .flat_map(move |y| xs.values().map(move |x| Coord { x, y }))
    })
}

pub(super) fn run<A: DggsAdapter + ?Sized>(adapter: &A, grid: &SampleGrid, ctx: &EnumerationContext) -> Enumeration {
    let mut emitter = Emitter::new(ctx);
    let Some(lattice) = Lattice::new(grid, &ctx.extent) else {
        return emitter.finish();
    };
    'rows: for y in lattice.ys.values() {
        if emitter.should_stop() {
            break;
        }
        if !(-90.0..=90.0).contains(&y) {
            continue;
        }
        for x in lattice.xs.values() {
            if !(-180.0..=180.0).contains(&x) {
                continue;
            }
            let id = match adapter.cell_at(Coord { x, y }, ctx.resolution) {
                Ok(id) => id,
                Err(DggsError::OutOfBounds { .. }) => continue,
                Err(e) => {
                    tracing::debug!(family = %adapter.family(), error = %e, "Sample: point lookup failed");
                    emitter.skip();
                    continue;
                }
            };
            if emitter.offer(adapter, id) == Flow::Stop {
                break 'rows;
            }
        }
    }
    emitter.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dggs::olc::OlcAdapter;
    use crate::enumerate::{enumerate, CancellationToken};

    #[test]
    fn test_grid_centers_cover_overlapping_cells() {
        let grid = SampleGrid::grid(2.0, 1.0, Coord { x: -180.0, y: -90.0 });
        let extent = GeoRect::new(1.0, 0.5, 4.0, 1.0).unwrap();
        let points: Vec<_> = sample_points(&grid, &extent).collect();
        let xs: Vec<f64> = points.iter().filter(|p| p.y == points[0].y).map(|p| p.x).collect();
        assert_eq!(xs, vec![1.0, 3.0]);
        assert!(points.iter().all(|p| p.y == 0.5));
    }

    #[test]
    fn test_strided_includes_far_edge() {
        let grid = SampleGrid::strided(35.0);
        let extent = GeoRect::new(0.0, 0.0, 50.0, 10.0).unwrap();
        let points: Vec<_> = sample_points(&grid, &extent).collect();
        let xs: Vec<f64> = points.iter().filter(|p| p.y == 0.0).map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 35.0, 50.0]);
    }

    #[test]
    fn test_degenerate_step_yields_nothing() {
        let grid = SampleGrid::strided(0.0);
        assert_eq!(sample_points(&grid, &GeoRect::world()).count(), 0);
    }

    #[test]
    fn test_fine_lattice_is_not_materialized() {
        // ~1.2e-7 degree cells over the whole world: far too many to collect.
        let grid = SampleGrid::grid(1.25e-7, 1.25e-7, Coord { x: -180.0, y: -90.0 });
        let mut points = sample_points(&grid, &GeoRect::world());
        let first = points.next().unwrap();
        assert!((first.x - (-180.0 + 0.625e-7)).abs() < 1e-9);
        assert!((first.y - (-90.0 + 0.625e-7)).abs() < 1e-9);
        assert_eq!(points.take(999).count(), 999);
    }

    #[test]
    fn test_fine_olc_stops_at_budget() {
        let adapter = OlcAdapter::new();
        let extent = GeoRect::new(10.0, 10.0, 10.01, 10.01).unwrap();
        let ctx = EnumerationContext::new(15, extent).with_max_cells(10);
        let result = enumerate(&adapter, &ctx).unwrap();
        assert!(result.truncated);
        assert_eq!(result.cells.len(), 10);
    }

    #[test]
    fn test_cancelled_sampling_emits_nothing() {
        let adapter = OlcAdapter::new();
        let extent = GeoRect::new(10.0, 10.0, 10.01, 10.01).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ctx = EnumerationContext::new(15, extent).with_cancel(cancel);
        let result = enumerate(&adapter, &ctx).unwrap();
        assert!(result.cancelled);
        assert!(result.cells.is_empty());
    }
}
