//! Enumeration kernels.
//!
//! One pass turns `(adapter, resolution, WGS84 extent)` into the cells of
//! that resolution touching the extent. The kernel is picked by the
//! adapter ([`DggsAdapter::strategy`]); everything around it is shared:
//!
//! - cancellation is checked between cells ([`CancellationToken`])
//! - the pass stops at the cell budget and reports `truncated`
//! - a cell whose polygon fails is logged at debug level and skipped
//! - every emitted polygon intersects the extent (non-strict)
//!
//! Nothing survives a pass; there is no cell cache between viewports.

mod bfs;
mod geo_extent;
mod prefix;
mod sampled;

pub use bfs::{bfs_from_seed, BfsOutcome};
pub use sampled::sample_points;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::dggs::{Cell, CellId, DggsAdapter, Strategy};
use crate::error::VgridError;
use crate::geometry::GeoRect;

/// Default maximum number of cells per pass.
pub const DEFAULT_MAX_CELLS: usize = 20_000;

/// Cooperative cancellation flag shared between a pass and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Inputs of one enumeration pass.
#[derive(Debug, Clone)]
pub struct EnumerationContext {
    /// Target resolution.
    pub resolution: u8,
    /// WGS84 extent, already clamped.
    pub extent: GeoRect,
    /// Stop after this many cells.
    pub max_cells: usize,
    /// Checked between cells.
    pub cancel: CancellationToken,
}

impl EnumerationContext {
    /// Context with the default budget and a fresh token.
    pub fn new(resolution: u8, extent: GeoRect) -> Self {
        Self {
            resolution,
            extent,
            max_cells: DEFAULT_MAX_CELLS,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the cell budget.
    pub fn with_max_cells(mut self, max_cells: usize) -> Self {
        self.max_cells = max_cells.max(1);
        self
    }

    /// Share an existing cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Result of one pass.
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    /// Emitted cells, in kernel order.
    pub cells: Vec<Cell>,
    /// Cells dropped because their id or polygon failed.
    pub skipped: usize,
    /// The budget stopped the pass early.
    pub truncated: bool,
    /// The token stopped the pass early.
    pub cancelled: bool,
}

impl Enumeration {
    /// Whether the pass ran to completion.
    pub fn is_complete(&self) -> bool {
        !self.truncated && !self.cancelled
    }

    /// Emitted ids.
    pub fn ids(&self) -> impl Iterator<Item = &CellId> {
        self.cells.iter().map(|c| &c.id)
    }
}

/// Collects cells for a pass and enforces budget, cancellation and dedup.
pub(crate) struct Emitter<'a> {
    ctx: &'a EnumerationContext,
    seen: HashSet<CellId>,
    out: Enumeration,
}

/// What the kernel should do after offering a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Stop,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(ctx: &'a EnumerationContext) -> Self {
        Self {
            ctx,
            seen: HashSet::new(),
            out: Enumeration::default(),
        }
    }

    /// Check cancellation and budget before doing more work.
    pub(crate) fn should_stop(&mut self) -> bool {
        if self.ctx.cancel.is_cancelled() {
            self.out.cancelled = true;
            return true;
        }
        if self.out.cells.len() >= self.ctx.max_cells {
            self.out.truncated = true;
            return true;
        }
        false
    }

    /// Resolve an id's polygon and emit it when it touches the extent.
    pub(crate) fn offer<A: DggsAdapter + ?Sized>(&mut self, adapter: &A, id: CellId) -> Flow {
        if self.should_stop() {
            return Flow::Stop;
        }
        if self.seen.contains(&id) {
            return Flow::Continue;
        }
        match adapter.cell_polygon(&id) {
            Ok(polygon) => {
                if self.ctx.extent.intersects_polygon(&polygon) {
                    self.seen.insert(id.clone());
                    self.out.cells.push(Cell { id, polygon });
                }
            }
            Err(e) => {
                tracing::debug!(family = %adapter.family(), cell = %id, error = %e, "Enumerate: skipping cell");
                self.out.skipped += 1;
            }
        }
        Flow::Continue
    }

    /// Emit an already-resolved cell without the intersection test.
    pub(crate) fn push(&mut self, cell: Cell) -> Flow {
        if self.should_stop() {
            return Flow::Stop;
        }
        if self.seen.insert(cell.id.clone()) {
            self.out.cells.push(cell);
        }
        Flow::Continue
    }

    pub(crate) fn skip(&mut self) {
        self.out.skipped += 1;
    }

    pub(crate) fn finish(mut self) -> Enumeration {
        if self.ctx.cancel.is_cancelled() {
            self.out.cancelled = true;
        }
        self.out
    }
}

/// Run one enumeration pass with the adapter's kernel.
///
/// # Arguments
///
/// * `adapter` - Family adapter
/// * `ctx` - Resolution, WGS84 extent, budget and cancellation token
///
/// # Returns
///
/// The emitted cells, or an error when the kernel as a whole failed
/// (for example an extent listing rejected by the backing library).
/// Per-cell failures never fail the pass.
pub fn enumerate<A: DggsAdapter + ?Sized>(adapter: &A, ctx: &EnumerationContext) -> Result<Enumeration, VgridError> {
    if ctx.extent.is_world() {
        if let Some(ids) = adapter.world_cells(ctx.resolution) {
            tracing::debug!(
                family = %adapter.family(),
                resolution = ctx.resolution,
                cells = ids.len(),
                "Enumerate: world listing"
            );
            let mut emitter = Emitter::new(ctx);
            for id in ids {
                if emitter.offer(adapter, id) == Flow::Stop {
                    break;
                }
            }
            return Ok(emitter.finish());
        }
    }

    let strategy = adapter.strategy(ctx.resolution);
    tracing::debug!(
        family = %adapter.family(),
        resolution = ctx.resolution,
        strategy = strategy.name(),
        extent = %ctx.extent,
        "Enumerate: start"
    );
    match strategy {
        Strategy::GeoExtentList(lister) => geo_extent::run(adapter, lister, ctx),
        Strategy::PrefixRefine(hierarchy) => Ok(prefix::run(adapter, hierarchy, ctx)),
        Strategy::BfsFromSeed(topology) => Ok(bfs_from_seed(adapter, topology, ctx)?.enumeration),
        Strategy::Sampled(grid) => Ok(sampled::run(adapter, &grid, ctx)),
    }
}

#[cfg(test)]
pub(crate) mod test_grid {
    //! A tiny 1°×1° lattice adapter exercising every kernel.

    use geo::{Coord, Polygon};

    use crate::dggs::{
        CellId, DggsAdapter, DggsError, ExtentLister, NeighborTopology, PrefixHierarchy, SampleGrid,
        Strategy,
    };
    use crate::family::DggsFamily;
    use crate::geometry::{bbox_polygon, GeoRect};

    /// Which kernel the test grid asks for.
    #[derive(Clone, Copy)]
    pub enum Kernel {
        List,
        Bfs,
        Sampled,
        Prefix,
    }

    /// Cells `"x:y"` covering `[x, x+1] × [y, y+1]` in degrees.
    pub struct DegreeGrid {
        pub kernel: Kernel,
        pub broken: Option<CellId>,
    }

    impl DegreeGrid {
        pub fn new(kernel: Kernel) -> Self {
            Self { kernel, broken: None }
        }

        fn parse(id: &CellId) -> Result<(i32, i32), DggsError> {
            let (x, y) = id
                .as_str()
                .split_once(':')
                .ok_or_else(|| DggsError::InvalidCell(id.to_string()))?;
            let x = x.parse().map_err(|_| DggsError::InvalidCell(id.to_string()))?;
            let y = y.parse().map_err(|_| DggsError::InvalidCell(id.to_string()))?;
            Ok((x, y))
        }

        fn id(x: i32, y: i32) -> CellId {
            CellId::new(format!("{}:{}", x, y))
        }
    }

    impl ExtentLister for DegreeGrid {
        fn list_cells(&self, _resolution: u8, extent: &GeoRect, _limit: usize) -> Result<Vec<CellId>, DggsError> {
            let mut ids = Vec::new();
            for y in extent.min_lat.floor() as i32..extent.max_lat.ceil() as i32 {
                for x in extent.min_lon.floor() as i32..extent.max_lon.ceil() as i32 {
                    ids.push(Self::id(x, y));
                }
            }
            Ok(ids)
        }
    }

    impl NeighborTopology for DegreeGrid {
        fn neighbors(&self, id: &CellId) -> Result<Vec<CellId>, DggsError> {
            let (x, y) = Self::parse(id)?;
            let mut out = Vec::new();
            for (dx, dy) in [(1, 0), (0, 1), (-1, 0), (0, -1)] {
                if (-90..90).contains(&(y + dy)) {
                    out.push(Self::id(x + dx, y + dy));
                }
            }
            Ok(out)
        }
    }

    impl PrefixHierarchy for DegreeGrid {
        fn roots(&self) -> Vec<CellId> {
            Vec::new()
        }

        fn children(&self, _id: &CellId) -> Result<Vec<CellId>, DggsError> {
            Ok(Vec::new())
        }
    }

    impl DggsAdapter for DegreeGrid {
        fn family(&self) -> DggsFamily {
            DggsFamily::Maidenhead
        }

        fn cell_at(&self, point: Coord<f64>, _resolution: u8) -> Result<CellId, DggsError> {
            Ok(Self::id(point.x.floor() as i32, point.y.floor() as i32))
        }

        fn cell_polygon(&self, id: &CellId) -> Result<Polygon<f64>, DggsError> {
            if self.broken.as_ref() == Some(id) {
                return Err(DggsError::InvalidCell(id.to_string()));
            }
            let (x, y) = Self::parse(id)?;
            Ok(bbox_polygon(x as f64, y as f64, x as f64 + 1.0, y as f64 + 1.0))
        }

        fn resolution_of(&self, _id: &CellId) -> Result<u8, DggsError> {
            Ok(1)
        }

        fn strategy(&self, _resolution: u8) -> Strategy<'_> {
            match self.kernel {
                Kernel::List => Strategy::GeoExtentList(self),
                Kernel::Bfs => Strategy::BfsFromSeed(self),
                Kernel::Prefix => Strategy::PrefixRefine(self),
                Kernel::Sampled => Strategy::Sampled(SampleGrid::grid(1.0, 1.0, Coord { x: 0.0, y: 0.0 })),
            }
        }
    }
}
